//! Checkout route handlers.
//!
//! Checkout requires a signed-in customer. Both the form and the submission
//! re-price the cart against today's listings; the order is only placed when
//! the cart the customer reviewed is still exactly what they would pay for.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chocolatier_core::address::AddressForm;
use chocolatier_core::cart::Cart;
use chocolatier_core::models::Order;
use chocolatier_core::pricing::OrderTotals;
use chocolatier_core::validation::{FieldErrors, non_blank};
use chocolatier_core::{OrderId, Toast};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{Page, RequireAuth, flash, load_cart, save_cart};
use crate::models::CurrentUser;
use crate::services::checkout::reprice_cart;
use crate::services::{CatalogService, CheckoutService, RepriceReport, Storefront};
use crate::state::AppState;

/// Longest order note accepted.
const MAX_NOTES: usize = 500;

/// Checkout form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub full_name: String,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    pub notes: String,
}

impl CheckoutForm {
    fn address(&self) -> AddressForm {
        AddressForm {
            full_name: self.full_name.clone(),
            line1: self.line1.clone(),
            line2: self.line2.clone(),
            city: self.city.clone(),
            region: self.region.clone(),
            postal_code: self.postal_code.clone(),
            country: self.country.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub page: Page,
    pub cart: Cart,
    pub totals: OrderTotals,
    pub form: CheckoutForm,
    pub errors: FieldErrors,
    pub cycle_name: Option<String>,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub page: Page,
    pub order: Order,
}

/// Re-price the session cart and persist any change.
async fn repriced_cart(
    state: &AppState,
    session: &Session,
) -> Result<(Storefront, Cart, RepriceReport)> {
    let catalog = CatalogService::new(state.store(), state.today());
    let storefront = catalog.storefront().await?;
    let mut cart = load_cart(session).await;
    let ids: Vec<_> = cart.items().iter().map(|line| line.product_id).collect();
    let listings = catalog.listings_for(&storefront, ids).await?;

    let before = cart.clone();
    let report = reprice_cart(&mut cart, &listings);
    if cart != before {
        save_cart(session, &cart).await?;
    }
    Ok((storefront, cart, report))
}

fn checkout_page(
    page: Page,
    cart: Cart,
    storefront: &Storefront,
    form: CheckoutForm,
    errors: FieldErrors,
) -> CheckoutTemplate {
    CheckoutTemplate {
        page,
        totals: OrderTotals::for_subtotal(cart.subtotal()),
        cart,
        form,
        errors,
        cycle_name: storefront.open_cycle.as_ref().map(|cycle| cycle.name.clone()),
    }
}

/// Display the checkout form.
#[instrument(skip(state, session, page, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    mut page: Page,
) -> Result<Response> {
    let (storefront, cart, report) = repriced_cart(&state, &session).await?;

    if !report.removed.is_empty() {
        if let Some(message) = report.message() {
            flash(&session, Toast::error(message)).await;
        }
        return Ok(Redirect::to("/cart").into_response());
    }
    if cart.is_empty() {
        flash(&session, Toast::info("Your cart is empty.")).await;
        return Ok(Redirect::to("/cart").into_response());
    }
    if let Some(message) = report.message() {
        page.toast = Some(Toast::info(message));
    }

    let form = CheckoutForm {
        full_name: user.full_name.clone().unwrap_or_default(),
        country: "US".to_string(),
        ..CheckoutForm::default()
    };
    Ok(checkout_page(page, cart, &storefront, form, FieldErrors::new()).into_response())
}

/// Validate the address, re-price and place the order.
#[instrument(skip(state, session, page, user, form), fields(user_id = %user.id))]
pub async fn place(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    page: Page,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let (storefront, cart, report) = repriced_cart(&state, &session).await?;

    if cart.is_empty() || !report.removed.is_empty() {
        let message = report
            .message()
            .unwrap_or_else(|| "Your cart is empty.".to_string());
        flash(&session, Toast::error(message)).await;
        return Ok(Redirect::to("/cart").into_response());
    }
    if let Some(message) = report.message() {
        // Prices moved since the form was shown; let the customer review.
        flash(&session, Toast::info(message)).await;
        return Ok(Redirect::to("/checkout").into_response());
    }

    let mut errors = FieldErrors::new();
    let notes = non_blank(&form.notes);
    if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES) {
        errors.add("notes", format!("Notes must be at most {MAX_NOTES} characters"));
    }
    let address = match form.address().validate() {
        Ok(address) if errors.is_empty() => address,
        Ok(_) => {
            return Ok(invalid(page, cart, &storefront, form, errors));
        }
        Err(address_errors) => {
            for (field, message) in address_errors.iter() {
                errors.add(field, message);
            }
            return Ok(invalid(page, cart, &storefront, form, errors));
        }
    };

    let cycle_id = cart
        .items()
        .iter()
        .any(|line| line.cycle_product_id.is_some())
        .then(|| storefront.open_cycle.as_ref().map(|cycle| cycle.id))
        .flatten();

    let order = CheckoutService::new(state.store())
        .place_order(&user, &cart, address, notes, cycle_id)
        .await?;

    save_cart(&session, &Cart::new()).await?;
    add_breadcrumb(
        "checkout",
        "Order placed",
        &[("order_id", order.id.to_string())],
    );
    flash(
        &session,
        Toast::success(format!("Thank you! Order {} is confirmed.", order.number())),
    )
    .await;
    Ok(Redirect::to(&format!("/checkout/confirmation/{}", order.id)).into_response())
}

fn invalid(
    page: Page,
    cart: Cart,
    storefront: &Storefront,
    form: CheckoutForm,
    errors: FieldErrors,
) -> Response {
    let mut page = page;
    if let Some(message) = errors.first_message() {
        page.toast = Some(Toast::error(message.to_string()));
    }
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        checkout_page(page, cart, storefront, form, errors),
    )
        .into_response()
}

/// Load an order the signed-in user owns.
///
/// Orders belonging to someone else are reported as missing.
///
/// # Errors
///
/// Returns `AppError::NotFound` when the order does not exist or is not
/// owned by `user`.
pub async fn owned_order(state: &AppState, user: &CurrentUser, id: i64) -> Result<Order> {
    state
        .store()
        .get_order(OrderId::new(id))
        .await?
        .filter(|order| order.user_id == user.id)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

/// Display the confirmation for a just-placed order.
#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn confirmation(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: Page,
    Path(id): Path<i64>,
) -> Result<ConfirmationTemplate> {
    let order = owned_order(&state, &user, id).await?;
    Ok(ConfirmationTemplate { page, order })
}
