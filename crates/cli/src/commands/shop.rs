//! Cart and checkout commands.

use clap::{Args, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use avenue_client::api::shop::{BillingDetails, Coordinates, DeliveryMethod};
use avenue_client::cart::{Cart, CartItem, CartService};
use avenue_client::checkout::{
    CheckoutController, CheckoutOutcome, OutOfStockResolution, PaymentPolling, Totals,
};
use avenue_core::{Price, ProductId};

use super::{CliError, Context, prompt};

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart
    List,
    /// Add a product
    Add {
        product_id: String,

        #[arg(short, long)]
        name: String,

        /// Unit price in COP
        #[arg(long)]
        price: Decimal,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        #[arg(short, long)]
        size: Option<String>,

        #[arg(long)]
        sku: Option<String>,
    },
    /// Remove a product line
    Remove {
        product_id: String,

        #[arg(short, long)]
        size: Option<String>,
    },
    /// Empty the cart
    Clear,
}

pub fn cart(ctx: &Context, action: CartAction) -> Result<(), CliError> {
    let service = CartService::new(ctx.api.store().clone());
    let cart = match action {
        CartAction::List => service.load()?,
        CartAction::Add {
            product_id,
            name,
            price,
            quantity,
            size,
            sku,
        } => service.add(CartItem {
            product_id: ProductId::new(product_id),
            sku,
            name,
            price,
            quantity,
            size,
            image: None,
        })?,
        CartAction::Remove { product_id, size } => {
            service.remove(&ProductId::new(product_id), size.as_deref())?
        }
        CartAction::Clear => {
            service.clear()?;
            Cart::default()
        }
    };
    print_cart(&cart);
    Ok(())
}

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Cart is empty");
        return;
    }
    for item in cart.items() {
        let size = item.size.as_deref().map(|s| format!(" ({s})")).unwrap_or_default();
        println!(
            "{:>3} × {}{size}  {}  [{}]",
            item.quantity,
            item.name,
            Price::cop(item.line_total()),
            item.product_id
        );
    }
    println!("Subtotal: {}", cart.subtotal_price());
}

fn print_totals(totals: &Totals) {
    for (label, amount) in totals.lines() {
        println!("{label:>10}: {amount}");
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutOfStockChoice {
    /// Ask what to do
    Ask,
    /// Remove unavailable items and keep the rest
    Remove,
    /// Clear the cart
    Abandon,
}

#[derive(Args)]
pub struct CheckoutArgs {
    #[arg(long)]
    full_name: String,

    #[arg(short, long)]
    email: String,

    #[arg(short, long)]
    phone: String,

    /// National ID number
    #[arg(long)]
    document_id: String,

    #[arg(long, default_value = "")]
    address: String,

    #[arg(long, default_value = "")]
    city: String,

    #[arg(long)]
    notes: Option<String>,

    /// Deliver to this latitude/longitude instead of store pickup
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    lat: Option<f64>,

    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lng: Option<f64>,

    /// Address shown to the courier
    #[arg(long)]
    delivery_address: Option<String>,

    #[arg(long)]
    coupon: Option<String>,

    #[arg(long)]
    accept_terms: bool,

    #[arg(long, value_enum, default_value_t = OutOfStockChoice::Ask)]
    on_out_of_stock: OutOfStockChoice,

    /// Wait for the payment gateway to report a final status
    #[arg(long)]
    wait_payment: bool,
}

pub async fn checkout(ctx: &Context, args: CheckoutArgs) -> Result<(), CliError> {
    let mut controller = CheckoutController::new(ctx.api.clone());

    if let (Some(lat), Some(lng)) = (args.lat, args.lng) {
        controller.set_delivery_method(DeliveryMethod::Delivery);
        let address = args.delivery_address.as_deref().unwrap_or(&args.address);
        let quote = controller
            .set_delivery_location(Coordinates { lat, lng }, address)
            .await?;
        if !quote.available {
            return Err(CliError::Usage(quote.message.unwrap_or_else(|| {
                "We don't deliver to that location".to_string()
            })));
        }
    } else {
        let store = controller.store_location().await?;
        println!("Pickup at {}", store.address);
    }

    if let Some(code) = &args.coupon {
        let coupon = controller.apply_coupon(code).await?;
        println!("Coupon {} applied", coupon.code);
    }
    print_totals(&controller.totals()?);

    let billing = BillingDetails {
        full_name: args.full_name,
        email: args.email,
        phone: args.phone,
        document_id: args.document_id,
        address: args.address,
        city: args.city,
        notes: args.notes,
    };

    match controller.submit(&billing, args.accept_terms).await? {
        CheckoutOutcome::Placed(order) => {
            if let Some(id) = &order.order_id {
                println!("Order {id} created");
            }
            if let Some(url) = &order.payment_url {
                println!("Pay at: {url}");
            }
            if let (true, Some(session_id)) = (args.wait_payment, order.session_id.as_deref()) {
                let status = controller
                    .poll_payment_status(session_id, PaymentPolling::default())
                    .await?;
                println!("Payment status: {status}");
            }
        }
        CheckoutOutcome::OutOfStock(items) => {
            println!("Some items are no longer available:");
            for item in &items {
                println!(
                    "  {} {} (asked {}, in stock {})",
                    item.name,
                    item.size.as_deref().unwrap_or(""),
                    item.requested,
                    item.available
                );
            }
            let resolution = match args.on_out_of_stock {
                OutOfStockChoice::Remove => OutOfStockResolution::RemoveUnavailable,
                OutOfStockChoice::Abandon => OutOfStockResolution::Abandon,
                OutOfStockChoice::Ask => {
                    let answer =
                        prompt("[r]emove them and keep shopping, or [a]bandon the cart").await?;
                    if answer.to_lowercase().starts_with('a') {
                        OutOfStockResolution::Abandon
                    } else {
                        OutOfStockResolution::RemoveUnavailable
                    }
                }
            };
            let cart = controller.resolve_out_of_stock(resolution)?;
            print_cart(&cart);
            if !cart.is_empty() {
                println!("Run checkout again to place the order.");
            }
        }
    }
    Ok(())
}
