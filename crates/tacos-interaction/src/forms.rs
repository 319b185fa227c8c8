//! Outbound request builders.
//!
//! Field names and endpoints are the remote site's native form contract and
//! must be reproduced exactly; there is no alternative API.

use crate::http::RemoteRequest;
use std::collections::HashSet;
use tacos_core::item::TacoOrder;
use tacos_core::order::{OrderForm, OrderType, QuantityChange, SideItemForm, SideItemKind};
use tacos_core::{Result, TacosError};

pub const CART_ENDPOINT: &str = "/ajax/owt.php";
pub const DELETE_ENDPOINT: &str = "/ajax/dt.php";
pub const SUMMARY_ENDPOINT: &str = "/ajax/os.php";
pub const SUBMIT_ENDPOINT: &str = "/ajax/RocknRoll.php";
pub const CATALOG_PATH: &str = "/office/stock_management.php?type=all";
pub const HOME_PATH: &str = "/";

fn field(name: impl Into<String>, value: impl Into<String>) -> (String, String) {
    (name.into(), value.into())
}

/// Rejects items the remote form would refuse or silently truncate.
pub fn validate_order(order: &TacoOrder) -> Result<()> {
    let size = order.size;
    if order.meats.len() > size.max_meats() {
        return Err(TacosError::InvalidRequest(format!(
            "{} accepts at most {} meats, got {}",
            size,
            size.max_meats(),
            order.meats.len()
        )));
    }
    if order.sauces.len() > size.max_sauces() {
        return Err(TacosError::InvalidRequest(format!(
            "{} accepts at most {} sauces, got {}",
            size,
            size.max_sauces(),
            order.sauces.len()
        )));
    }

    let mut seen = HashSet::new();
    for meat in &order.meats {
        if meat.code.trim().is_empty() {
            return Err(TacosError::InvalidRequest("Empty meat code".into()));
        }
        if meat.quantity == 0 {
            return Err(TacosError::InvalidRequest(format!(
                "Meat '{}' has quantity 0",
                meat.code
            )));
        }
        // Quantities are keyed by code, so a repeated code would collapse.
        if !seen.insert(meat.code.as_str()) {
            return Err(TacosError::InvalidRequest(format!(
                "Meat '{}' listed twice",
                meat.code
            )));
        }
    }
    if order
        .sauces
        .iter()
        .chain(&order.garnitures)
        .any(|code| code.trim().is_empty())
    {
        return Err(TacosError::InvalidRequest("Empty ingredient code".into()));
    }
    Ok(())
}

/// `POST /ajax/owt.php` adding one item to the cart.
pub fn add_item_request(order: &TacoOrder) -> Result<RemoteRequest> {
    validate_order(order)?;

    let mut fields = vec![
        field("taille", order.size.code()),
        field("tacosNote", order.note.clone().unwrap_or_default()),
    ];
    fields.extend(order.meats.iter().map(|m| field("viande[]", m.code.clone())));
    fields.extend(order.sauces.iter().map(|s| field("sauce[]", s.clone())));
    fields.extend(order.garnitures.iter().map(|g| field("garniture[]", g.clone())));
    fields.extend(
        order
            .meats
            .iter()
            .map(|m| field(format!("meat_quantity[{}]", m.code), m.quantity.to_string())),
    );

    Ok(RemoteRequest::post_form(CART_ENDPOINT, fields))
}

/// `POST /ajax/owt.php` returning the rendered cart blocks.
pub fn list_items_request() -> RemoteRequest {
    RemoteRequest::post_form(CART_ENDPOINT, vec![field("loadProducts", "true")])
}

pub fn change_quantity_request(remote_index: usize, change: QuantityChange) -> RemoteRequest {
    RemoteRequest::post_form(
        CART_ENDPOINT,
        vec![
            field("action", change.action()),
            field("index", remote_index.to_string()),
        ],
    )
}

pub fn delete_item_request(remote_index: usize) -> RemoteRequest {
    RemoteRequest::post_form(DELETE_ENDPOINT, vec![field("index", remote_index.to_string())])
}

/// JSON post to the category endpoint (`ues.php`, `ubs.php` or `usd.php`).
pub fn side_item_request(kind: SideItemKind, form: &SideItemForm) -> Result<RemoteRequest> {
    if form.quantity == 0 {
        return Err(TacosError::InvalidRequest(format!(
            "Side item '{}' has quantity 0",
            form.id
        )));
    }
    if kind != SideItemKind::Extra && !form.free_sauces.is_empty() {
        return Err(TacosError::InvalidRequest(format!(
            "Free sauces only apply to extras, not to {}",
            kind
        )));
    }
    let body = serde_json::to_value(form)?;
    Ok(RemoteRequest::post_json(kind.endpoint(), body))
}

/// The summary endpoint only answers POSTs carrying the token field.
pub fn order_summary_request() -> RemoteRequest {
    RemoteRequest::post_form(SUMMARY_ENDPOINT, Vec::new())
        .with_header("Accept", "text/html")
}

/// Multipart `POST /ajax/RocknRoll.php` finalizing the order.
pub fn submit_order_request(form: &OrderForm) -> Result<RemoteRequest> {
    if form.name.trim().is_empty() || form.phone.trim().is_empty() {
        return Err(TacosError::InvalidRequest(
            "Customer name and phone are required".into(),
        ));
    }
    if form.order_type == OrderType::Delivery && form.address.trim().is_empty() {
        return Err(TacosError::InvalidRequest(
            "Delivery orders need an address".into(),
        ));
    }

    let mut fields = vec![
        field("name", form.name.clone()),
        field("phone", form.phone.clone()),
        field("confirmPhone", form.phone.clone()),
        field("address", form.address.clone()),
        field("type", form.order_type.to_string()),
        field("requestedFor", form.requested_for.clone()),
        field("transaction_id", form.transaction_id.clone()),
    ];
    if let Some(method) = form.payment_method {
        fields.push(field("payment_method", method.to_string()));
    }

    Ok(RemoteRequest::post_multipart(SUBMIT_ENDPOINT, fields))
}

pub fn catalog_request() -> RemoteRequest {
    RemoteRequest::get(CATALOG_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RemoteBody;
    use tacos_core::item::{MeatSelection, TacoSize};
    use tacos_core::order::PaymentMethod;

    fn order() -> TacoOrder {
        TacoOrder {
            size: TacoSize::Xl,
            meats: vec![
                MeatSelection {
                    code: "viande_hachee".into(),
                    quantity: 2,
                },
                MeatSelection {
                    code: "poulet".into(),
                    quantity: 1,
                },
            ],
            sauces: vec!["harissa".into(), "blanche".into()],
            garnitures: vec!["salade".into()],
            note: Some("Pas trop épicé".into()),
        }
    }

    #[test]
    fn test_add_item_uses_native_field_names() {
        let request = add_item_request(&order()).unwrap();

        assert_eq!(request.path, CART_ENDPOINT);
        assert_eq!(request.field("taille"), Some("tacos_XL"));
        assert_eq!(request.field("tacosNote"), Some("Pas trop épicé"));
        assert_eq!(
            request.fields("viande[]"),
            vec!["viande_hachee", "poulet"]
        );
        assert_eq!(
            request.fields("sauce[]"),
            vec!["harissa", "blanche"]
        );
        assert_eq!(request.field("garniture[]"), Some("salade"));
        assert_eq!(request.field("meat_quantity[viande_hachee]"), Some("2"));
        assert_eq!(request.field("meat_quantity[poulet]"), Some("1"));
    }

    #[test]
    fn test_too_many_meats_for_size_is_rejected() {
        let mut small = order();
        small.size = TacoSize::L;

        let err = add_item_request(&small).unwrap_err();
        assert!(matches!(err, TacosError::InvalidRequest(_)));
    }

    #[test]
    fn test_duplicate_meat_is_rejected() {
        let mut dup = order();
        dup.meats[1].code = "viande_hachee".into();
        assert!(validate_order(&dup).is_err());
    }

    #[test]
    fn test_quantity_and_delete_requests() {
        let increase = change_quantity_request(2, QuantityChange::Increase);
        assert_eq!(increase.field("action"), Some("increaseQuantity"));
        assert_eq!(increase.field("index"), Some("2"));

        let delete = delete_item_request(0);
        assert_eq!(delete.path, DELETE_ENDPOINT);
        assert_eq!(delete.field("index"), Some("0"));
    }

    #[test]
    fn test_submit_is_multipart_with_confirm_phone() {
        let form = OrderForm {
            name: "Ada".into(),
            phone: "+41790000000".into(),
            address: "Rue du Midi 1, 1003 Lausanne".into(),
            order_type: OrderType::Delivery,
            requested_for: "12:30".into(),
            transaction_id: "tx-1".into(),
            payment_method: Some(PaymentMethod::Twint),
        };

        let request = submit_order_request(&form).unwrap();

        assert!(matches!(request.body, RemoteBody::Multipart(_)));
        assert_eq!(request.field("confirmPhone"), Some("+41790000000"));
        assert_eq!(request.field("type"), Some("livraison"));
        assert_eq!(request.field("payment_method"), Some("twint"));
    }

    #[test]
    fn test_delivery_without_address_is_rejected() {
        let form = OrderForm {
            name: "Ada".into(),
            phone: "+41790000000".into(),
            address: " ".into(),
            order_type: OrderType::Delivery,
            requested_for: "12:30".into(),
            transaction_id: "tx-1".into(),
            payment_method: None,
        };
        assert!(submit_order_request(&form).is_err());
    }

    #[test]
    fn test_side_item_json_payload() {
        let form = SideItemForm {
            id: "frites".into(),
            name: "Portion frites".into(),
            price: 4.0,
            quantity: 1,
            free_sauces: vec!["ketchup".into()],
        };

        let request = side_item_request(SideItemKind::Extra, &form).unwrap();
        assert_eq!(request.path, "/ajax/ues.php");
        match &request.body {
            RemoteBody::Json(body) => assert_eq!(body["free_sauces"][0], "ketchup"),
            other => panic!("unexpected body {:?}", other),
        }

        assert!(side_item_request(SideItemKind::Drink, &form).is_err());
    }
}
