use crate::domain::notification::{Action, Classification, Notification};
use crate::domain::order::{BOOKING_PARAM, BookingIntent, OrderId};
use crate::error::{PaymentError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

/// Fields picked out of a notification document before validation.
#[derive(Debug, Default, PartialEq)]
pub struct RawNotification {
    pub order_id: Option<String>,
    pub action: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub processed_amount: Option<String>,
    pub params: BTreeMap<String, String>,
}

#[derive(Default)]
struct PendingParam {
    name: Option<String>,
    value: Option<String>,
}

/// Walks the document and collects the fields we care about.
///
/// The walk is tolerant: element names match case-insensitively, mismatched
/// end tags are accepted, and a syntax error ends the walk while keeping
/// everything read up to that point.
pub fn scan(xml: &str) -> RawNotification {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;

    let mut raw = RawNotification::default();
    let mut path: Vec<String> = Vec::new();
    let mut param: Option<PendingParam> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = element_name(&e);
                raw.read_attributes(&name, &e);
                if name == "param" {
                    param = Some(PendingParam::default());
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = element_name(&e);
                raw.read_attributes(&name, &e);
            }
            Ok(Event::Text(t)) => {
                if let Ok(text) = t.unescape() {
                    raw.read_text(&path, param.as_mut(), &text);
                }
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                raw.read_text(&path, param.as_mut(), &text);
            }
            Ok(Event::End(_)) => {
                if path.pop().as_deref() == Some("param")
                    && let Some(PendingParam {
                        name: Some(name),
                        value,
                    }) = param.take()
                {
                    // First occurrence wins.
                    raw.params
                        .entry(name.trim().to_string())
                        .or_insert_with(|| value.unwrap_or_default().trim().to_string());
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(
                    position = reader.error_position(),
                    error = %e,
                    "notification scan stopped at malformed XML"
                );
                break;
            }
        }
    }

    raw
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase()
}

impl RawNotification {
    fn read_attributes(&mut self, element: &str, e: &BytesStart<'_>) {
        for attr in e.attributes().flatten() {
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_ascii_lowercase();
            let Ok(value) = attr.unescape_value() else {
                continue;
            };
            match (element, key.as_str()) {
                ("order", "id") if self.order_id.is_none() => self.order_id = Some(value.into_owned()),
                ("error", "code") if self.error_code.is_none() => {
                    self.error_code = Some(value.into_owned())
                }
                (_, "action") if self.action.is_none() => self.action = Some(value.into_owned()),
                _ => {}
            }
        }
    }

    fn read_text(&mut self, path: &[String], param: Option<&mut PendingParam>, text: &str) {
        let Some(current) = path.last() else {
            return;
        };
        let parent = path.len().checked_sub(2).map(|i| path[i].as_str());

        let slot = match (parent, current.as_str(), param) {
            (Some("param"), "name", Some(p)) => &mut p.name,
            (Some("param"), "value", Some(p)) => &mut p.value,
            (_, "action", _) => &mut self.action,
            (_, "error", _) => &mut self.error_message,
            (_, "processed_amount", _) => &mut self.processed_amount,
            _ => return,
        };
        slot.get_or_insert_with(String::new).push_str(text);
    }
}

/// Validates a decrypted notification document.
///
/// Fails only when the action is missing, when an approved or cancelled
/// notification lacks a valid order id, or when an approved notification
/// lacks a usable booking param. Anything else unexpected in the
/// document is ignored.
pub fn parse(xml: &str) -> Result<Notification> {
    let raw = scan(xml);

    let action = raw
        .action
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(Action::parse)
        .ok_or(PaymentError::MissingField("action"))?;

    let order_id = raw
        .order_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    // Unrecognized actions are acknowledged as-is, so their id is informational.
    let (order_id, booking) = match action.classify() {
        Classification::Approved => {
            let order_id = required_order_id(order_id)?;
            let param = raw
                .params
                .get(BOOKING_PARAM)
                .filter(|v| !v.is_empty())
                .ok_or(PaymentError::MissingField("booking param"))?;
            (Some(order_id), Some(BookingIntent::decode(param)?))
        }
        Classification::Cancelled => (Some(required_order_id(order_id)?), None),
        Classification::Unrecognized => (order_id.and_then(|id| OrderId::new(id).ok()), None),
    };

    let processed_amount = raw
        .processed_amount
        .as_deref()
        .and_then(|amount| amount.trim().parse::<Decimal>().ok());

    Ok(Notification {
        order_id,
        action,
        error_code: raw.error_code,
        error_message: raw.error_message,
        processed_amount,
        params: raw.params,
        booking,
    })
}

fn required_order_id(order_id: Option<&str>) -> Result<OrderId> {
    let order_id = order_id.ok_or(PaymentError::MissingField("order id"))?;
    OrderId::new(order_id)
        .map_err(|_| PaymentError::InvalidPayload("order id is not gateway-safe".to_string()))
}
