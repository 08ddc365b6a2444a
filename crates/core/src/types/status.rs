//! Status enums for backend resources.
//!
//! All of these mirror the lowercase snake_case strings the backend puts in
//! its JSON. Unknown strings fail to parse rather than being mapped to a
//! default, so a backend change shows up as a parse error instead of a
//! silently wrong screen.

use serde::{Deserialize, Serialize};

/// Generates `as_str`, `Display` and `FromStr` for a snake_case status enum.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// The wire representation of this value.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(
                        concat!("unknown ", stringify!($name), ": {}"),
                        other
                    )),
                }
            }
        }
    };
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Shop and studio customer.
    #[default]
    Customer,
    /// UGC content creator.
    Creator,
    /// Brand buying UGC content.
    Brand,
    /// Backoffice staff.
    Admin,
}

string_enum!(UserRole {
    Customer => "customer",
    Creator => "creator",
    Brand => "brand",
    Admin => "admin",
});

/// Shop order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

string_enum!(OrderStatus {
    Pending => "pending",
    Paid => "paid",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

/// Payment gateway status as reported by the checkout status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Expired,
}

string_enum!(PaymentStatus {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Expired => "expired",
});

impl PaymentStatus {
    /// Whether polling can stop.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Studio reservation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

string_enum!(ReservationStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
    Completed => "completed",
});

/// UGC campaign lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Closed,
}

string_enum!(CampaignStatus {
    Draft => "draft",
    Active => "active",
    Paused => "paused",
    Closed => "closed",
});

/// Creator application to a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

string_enum!(ApplicationStatus {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
    Withdrawn => "withdrawn",
});

/// Deliverable review state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliverableStatus {
    #[default]
    Pending,
    Submitted,
    ChangesRequested,
    Approved,
}

string_enum!(DeliverableStatus {
    Pending => "pending",
    Submitted => "submitted",
    ChangesRequested => "changes_requested",
    Approved => "approved",
});

impl DeliverableStatus {
    /// Whether the creator still owes work on this deliverable.
    #[must_use]
    pub const fn awaits_creator(&self) -> bool {
        matches!(self, Self::Pending | Self::ChangesRequested)
    }
}
