// Request validation module
// Turns an untrusted order body into a typed OrderIntake, or an ordered list of violations

use serde_json::{Map, Value};
use std::borrow::Cow;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{ErrorKind, ServiceError};
use crate::orders::{
    OrderIntake, OrderIntakeRequest, OrderLineIntake, OrderLineRequest, ServiceType,
};

pub const MALFORMED_BODY_MESSAGE: &str = "Format de requête invalide";
pub const INVALID_ORDER_MESSAGE: &str = "Données de commande invalides";

/// Upper bound on cart lines accepted in one order
pub const MAX_CART_LINES: usize = 100;

/// Emission order of top-level fields (serde and Rust names)
const INTAKE_FIELDS: &[&[&str]] = &[
    &["items"],
    &["table_number", "tableNumber"],
    &["customer_name", "customerName"],
    &["service_type"],
    &["coupon_code"],
    &["notes"],
];

/// Emission order of line fields
const LINE_FIELDS: &[&[&str]] = &[
    &["id"],
    &["name"],
    &["price"],
    &["quantity"],
    &["category_name"],
    &["selected_option", "selectedOption"],
    &["selected_variant", "selectedVariant"],
];

fn error_with_message(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Validates that a menu item identifier is UUID-shaped
pub fn validate_uuid(id: &str) -> Result<(), ValidationError> {
    Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| error_with_message("invalid_uuid", "Identifiant d'article invalide"))
}

/// Validates that an item name has visible characters
pub fn validate_item_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        Err(error_with_message("blank_name", "Le nom de l'article est requis"))
    } else {
        Ok(())
    }
}

/// Validates the cart does not exceed the line limit
pub fn validate_cart_size(items: &[OrderLineRequest]) -> Result<(), ValidationError> {
    if items.len() > MAX_CART_LINES {
        Err(error_with_message("too_many_items", "Trop d'articles dans le panier"))
    } else {
        Ok(())
    }
}

fn message_of(field: &str, error: &ValidationError) -> String {
    match &error.message {
        Some(message) => message.to_string(),
        None => format!("{}: {}", field, error.code),
    }
}

/// Messages attached to one field, under any of its names
fn messages_for(errors: &ValidationErrors, names: &[&str]) -> Vec<String> {
    let field_errors = errors.field_errors();
    names
        .iter()
        .filter_map(|name| field_errors.get(*name).map(|errs| (*name, *errs)))
        .flat_map(|(name, errs)| errs.iter().map(move |e| message_of(name, e)))
        .collect()
}

/// Flatten field errors into messages, following `order`
fn ordered_messages(errors: &ValidationErrors, order: &[&[&str]]) -> Vec<String> {
    order
        .iter()
        .flat_map(|names| messages_for(errors, names))
        .collect()
}

fn wrong_type(field: &str, expected: &str) -> String {
    format!("Le champ \"{}\" doit être {}", field, expected)
}

fn check_optional_string(object: &Map<String, Value>, field: &str, out: &mut Vec<String>) {
    match object.get(field) {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(_) => out.push(wrong_type(field, "une chaîne de caractères")),
    }
}

fn check_modifier(object: &Map<String, Value>, field: &str, out: &mut Vec<String>) {
    match object.get(field) {
        None | Some(Value::Null) => {}
        Some(Value::Object(modifier)) => {
            if !matches!(modifier.get("name"), Some(Value::String(_))) {
                out.push(wrong_type(&format!("{}.name", field), "une chaîne de caractères"));
            }
            if !matches!(modifier.get("price"), None | Some(Value::Null) | Some(Value::Number(_))) {
                out.push(wrong_type(&format!("{}.price", field), "un nombre"));
            }
        }
        Some(_) => out.push(wrong_type(field, "un objet")),
    }
}

fn line_shape_violations(line: &Value) -> Vec<String> {
    let Some(object) = line.as_object() else {
        return vec!["Format d'article invalide".to_string()];
    };

    let mut out = Vec::new();
    for field in ["id", "name"] {
        match object.get(field) {
            Some(Value::String(_)) => {}
            None | Some(Value::Null) => out.push(format!("Le champ \"{}\" est requis", field)),
            Some(_) => out.push(wrong_type(field, "une chaîne de caractères")),
        }
    }
    match object.get("price") {
        Some(Value::Number(_)) => {}
        None | Some(Value::Null) => out.push("Le champ \"price\" est requis".to_string()),
        Some(_) => out.push(wrong_type("price", "un nombre")),
    }
    match object.get("quantity") {
        Some(value) if value.is_i64() => {}
        None | Some(Value::Null) => out.push("Le champ \"quantity\" est requis".to_string()),
        Some(_) => out.push(wrong_type("quantity", "un nombre entier")),
    }
    check_optional_string(object, "category_name", &mut out);
    check_modifier(object, "selectedOption", &mut out);
    check_modifier(object, "selectedVariant", &mut out);
    out
}

/// Type errors in the raw body, one French message per offending field
///
/// Runs before deserialization so a wrong shape reports every field at once,
/// in the same order as rule violations.
pub fn shape_violations(body: &Value) -> Vec<String> {
    let Some(object) = body.as_object() else {
        return vec!["Le corps de la commande doit être un objet".to_string()];
    };

    let mut violations = Vec::new();
    match object.get("items") {
        Some(Value::Array(items)) => {
            for (index, line) in items.iter().enumerate() {
                for message in line_shape_violations(line) {
                    violations.push(format!("Article {}: {}", index + 1, message));
                }
            }
        }
        None | Some(Value::Null) => violations.push("Le champ \"items\" est requis".to_string()),
        Some(_) => violations.push(wrong_type("items", "une liste")),
    }

    check_optional_string(object, "tableNumber", &mut violations);
    check_optional_string(object, "customerName", &mut violations);
    match object.get("service_type") {
        None | Some(Value::Null) => {}
        Some(value) => {
            if serde_json::from_value::<ServiceType>(value.clone()).is_err() {
                violations.push("Type de service inconnu".to_string());
            }
        }
    }
    check_optional_string(object, "coupon_code", &mut violations);
    check_optional_string(object, "notes", &mut violations);
    violations
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Collect every violation of the intake payload in emission order
///
/// Cart-level rules first, then each line in cart order, then the other
/// top-level fields.
pub fn collect_violations(request: &OrderIntakeRequest) -> Vec<String> {
    let intake_errors = request.validate().err();
    let mut violations = intake_errors
        .as_ref()
        .map(|errors| messages_for(errors, INTAKE_FIELDS[0]))
        .unwrap_or_default();

    for (index, line) in request.items.iter().enumerate() {
        if let Err(errors) = line.validate() {
            for message in ordered_messages(&errors, LINE_FIELDS) {
                violations.push(format!("Article {}: {}", index + 1, message));
            }
        }
    }

    if let Some(errors) = intake_errors.as_ref() {
        violations.extend(ordered_messages(errors, &INTAKE_FIELDS[1..]));
    }
    violations
}

/// Parse and schema-validate a raw order body
///
/// A body that is not JSON is a malformed request; JSON of the wrong shape
/// or breaking a rule is invalid order data carrying `details`.
pub fn parse_order_intake(body: &[u8]) -> Result<OrderIntake, ServiceError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        tracing::debug!("Malformed order body: {}", e);
        ServiceError::validation(MALFORMED_BODY_MESSAGE)
    })?;

    let shape = shape_violations(&value);
    if !shape.is_empty() {
        return Err(ServiceError::with_details(
            INVALID_ORDER_MESSAGE,
            ErrorKind::Validation,
            shape,
        ));
    }

    let request: OrderIntakeRequest = serde_json::from_value(value).map_err(|e| {
        tracing::debug!("Order body does not match schema: {}", e);
        ServiceError::with_details(
            INVALID_ORDER_MESSAGE,
            ErrorKind::Validation,
            vec!["Format de commande invalide".to_string()],
        )
    })?;

    let violations = collect_violations(&request);
    if !violations.is_empty() {
        return Err(ServiceError::with_details(
            INVALID_ORDER_MESSAGE,
            ErrorKind::Validation,
            violations,
        ));
    }

    into_intake(request)
}

fn into_intake(request: OrderIntakeRequest) -> Result<OrderIntake, ServiceError> {
    let lines = request
        .items
        .into_iter()
        .map(|line| {
            // Both conversions were checked by the validators above.
            let menu_item_id = Uuid::parse_str(&line.id).map_err(|_| {
                ServiceError::with_details(
                    INVALID_ORDER_MESSAGE,
                    ErrorKind::Validation,
                    vec!["Identifiant d'article invalide".to_string()],
                )
            })?;
            let quantity = u32::try_from(line.quantity).map_err(|_| {
                ServiceError::with_details(
                    INVALID_ORDER_MESSAGE,
                    ErrorKind::Validation,
                    vec!["La quantité doit être comprise entre 1 et 999".to_string()],
                )
            })?;

            Ok(OrderLineIntake {
                menu_item_id,
                name: line.name.trim().to_string(),
                client_unit_price: line.price,
                quantity,
                category_name: non_blank(line.category_name),
                selected_option: non_blank(line.selected_option.map(|m| m.name)),
                selected_variant: non_blank(line.selected_variant.map(|m| m.name)),
            })
        })
        .collect::<Result<Vec<_>, ServiceError>>()?;

    Ok(OrderIntake {
        lines,
        table_number: non_blank(request.table_number),
        customer_name: non_blank(request.customer_name),
        service_type: request.service_type.unwrap_or_default(),
        coupon_code: non_blank(request.coupon_code).map(|code| code.to_uppercase()),
        notes: non_blank(request.notes),
    })
}
