//! Cart route handlers.
//!
//! The cart lives in the session as a [`Cart`] value. Mutations redirect back
//! to the cart page with a toast describing what happened.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use chocolatier_core::cart::{Cart, CartError};
use chocolatier_core::pricing::OrderTotals;
use chocolatier_core::{ProductId, Toast};
use serde::{Deserialize, Deserializer};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{Page, flash, load_cart, save_cart};
use crate::services::CatalogService;
use crate::state::AppState;

/// Deserialize a quantity field, treating blank or non-numeric input as absent.
fn blank_quantity_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.and_then(|s| s.trim().parse().ok()))
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i64,
    #[serde(default, deserialize_with = "blank_quantity_as_none")]
    pub quantity: Option<u32>,
}

/// Line adjustment requested by the cart page.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LineAction {
    Increment,
    Decrement,
    Set,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: i64,
    pub action: LineAction,
    /// Required for [`LineAction::Set`].
    #[serde(default, deserialize_with = "blank_quantity_as_none")]
    pub quantity: Option<u32>,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: i64,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: Page,
    pub cart: Cart,
    pub totals: OrderTotals,
}

/// Cart count badge fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Apply a line adjustment to the cart.
///
/// # Errors
///
/// Returns `CartError::NotInCart` for unknown lines and
/// `CartError::ZeroQuantity` when a set is missing its quantity.
pub fn apply_update(cart: &mut Cart, form: &UpdateCartForm) -> std::result::Result<(), CartError> {
    let product_id = ProductId::new(form.product_id);
    match form.action {
        LineAction::Increment => cart.increment(product_id),
        LineAction::Decrement => cart.decrement(product_id),
        LineAction::Set => {
            let quantity = form.quantity.ok_or(CartError::ZeroQuantity)?;
            cart.set_quantity(product_id, quantity)
        }
    }
}

/// Display cart page.
#[instrument(skip(session, page))]
pub async fn show(session: Session, page: Page) -> CartShowTemplate {
    let cart = load_cart(&session).await;
    let totals = OrderTotals::for_subtotal(cart.subtotal());
    CartShowTemplate { page, cart, totals }
}

/// Add a product to the cart at today's price.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let product_id = ProductId::new(form.product_id);
    let quantity = form.quantity.unwrap_or(1);

    let catalog = CatalogService::new(state.store(), state.today());
    let storefront = catalog.storefront().await?;
    let Some(listing) = catalog.listing(&storefront, product_id).await? else {
        flash(&session, Toast::error("That product is no longer in our catalog.")).await;
        return Ok(Redirect::to("/products").into_response());
    };

    if !listing.is_available {
        flash(
            &session,
            Toast::error(format!("{} is not available right now.", listing.product.name)),
        )
        .await;
        return Ok(Redirect::to(&format!("/products/{product_id}")).into_response());
    }

    let mut cart = load_cart(&session).await;
    match cart.add(listing.to_cart_item(quantity)) {
        Ok(line_quantity) => {
            save_cart(&session, &cart).await?;
            add_breadcrumb(
                "cart",
                "Added to cart",
                &[
                    ("product_id", product_id.to_string()),
                    ("quantity", line_quantity.to_string()),
                ],
            );
            flash(
                &session,
                Toast::success(format!("Added {} to your cart.", listing.product.name)),
            )
            .await;
            Ok(Redirect::to("/cart").into_response())
        }
        Err(e) => {
            flash(&session, Toast::error(capitalize(&e.to_string()))).await;
            Ok(Redirect::to(&format!("/products/{product_id}")).into_response())
        }
    }
}

/// Change the quantity of a cart line.
#[instrument(skip(session))]
pub async fn update(session: Session, Form(form): Form<UpdateCartForm>) -> Result<Redirect> {
    let mut cart = load_cart(&session).await;
    match apply_update(&mut cart, &form) {
        Ok(()) => save_cart(&session, &cart).await?,
        Err(e) => flash(&session, Toast::error(capitalize(&e.to_string()))).await,
    }
    Ok(Redirect::to("/cart"))
}

/// Remove a line from the cart.
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<RemoveFromCartForm>) -> Result<Redirect> {
    let mut cart = load_cart(&session).await;
    match cart.remove(ProductId::new(form.product_id)) {
        Ok(line) => {
            save_cart(&session, &cart).await?;
            flash(&session, Toast::info(format!("Removed {} from your cart.", line.name))).await;
        }
        Err(e) => flash(&session, Toast::error(capitalize(&e.to_string()))).await,
    }
    Ok(Redirect::to("/cart"))
}

/// Empty the cart.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Redirect> {
    save_cart(&session, &Cart::new()).await?;
    flash(&session, Toast::info("Your cart is now empty.")).await;
    Ok(Redirect::to("/cart"))
}

/// Cart count badge fragment.
#[instrument(skip(session))]
pub async fn count(session: Session) -> CartCountTemplate {
    CartCountTemplate {
        count: load_cart(&session).await.item_count(),
    }
}

/// Cart error messages are lower-case sentences; toasts start upper-case.
fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        format!("{}{}.", first.to_uppercase(), chars.as_str())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chocolatier_core::Money;
    use chocolatier_core::cart::CartItem;

    use super::*;

    fn cart_with(id: i64, quantity: u32) -> Cart {
        let mut cart = Cart::new();
        cart.add(CartItem {
            product_id: ProductId::new(id),
            cycle_product_id: None,
            name: "Ruby Heart Box".to_string(),
            unit_price: Money::from_cents(3400),
            image_url: None,
            quantity,
        })
        .unwrap();
        cart
    }

    fn form(action: LineAction, quantity: Option<u32>) -> UpdateCartForm {
        UpdateCartForm {
            product_id: 1,
            action,
            quantity,
        }
    }

    #[test]
    fn test_apply_update_actions() {
        let mut cart = cart_with(1, 2);
        apply_update(&mut cart, &form(LineAction::Increment, None)).unwrap();
        assert_eq!(cart.item_count(), 3);
        apply_update(&mut cart, &form(LineAction::Decrement, None)).unwrap();
        assert_eq!(cart.item_count(), 2);
        apply_update(&mut cart, &form(LineAction::Set, Some(5))).unwrap();
        assert_eq!(cart.item_count(), 5);
        apply_update(&mut cart, &form(LineAction::Set, Some(0))).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_apply_update_errors() {
        let mut cart = cart_with(1, 1);
        assert_eq!(
            apply_update(&mut cart, &form(LineAction::Set, None)),
            Err(CartError::ZeroQuantity)
        );
        let missing = UpdateCartForm {
            product_id: 99,
            action: LineAction::Increment,
            quantity: None,
        };
        assert_eq!(apply_update(&mut cart, &missing), Err(CartError::NotInCart));
    }

    #[test]
    fn test_blank_quantity_deserializes_as_none() {
        let parse = |quantity: serde_json::Value| {
            serde_json::from_value::<UpdateCartForm>(serde_json::json!({
                "product_id": 1,
                "action": "set",
                "quantity": quantity,
            }))
            .unwrap()
            .quantity
        };

        assert_eq!(parse(serde_json::json!("")), None);
        assert_eq!(parse(serde_json::json!(" 4 ")), Some(4));
        assert_eq!(parse(serde_json::json!("lots")), None);
        assert_eq!(parse(serde_json::json!(null)), None);

        let add: AddToCartForm =
            serde_json::from_value(serde_json::json!({ "product_id": 3 })).unwrap();
        assert_eq!(add.quantity, None);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("that item is not in your cart"), "That item is not in your cart.");
        assert_eq!(capitalize(""), "");
    }
}
