use crate::domain::order::{BOOKING_PARAM, OrderParams};
use crate::error::Result;
use chrono::{Local, NaiveDateTime};
use quick_xml::escape::escape;

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Local wall-clock time, as the gateway expects in the `timestamp` attribute.
pub fn timestamp_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Renders the order document posted to the gateway.
///
/// Element names and order are fixed by the gateway. Every caller-supplied
/// value is escaped: the gateway reads this document back to us inside the
/// notification, where a stray `<` would corrupt the fields after it.
pub fn build(params: &OrderParams, merchant_id: &str, timestamp: NaiveDateTime) -> Result<String> {
    params.validate()?;
    let booking = params.booking.encode()?;
    let contact = &params.contact;

    Ok(format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<order type="card" id="{order_id}" timestamp="{timestamp}">
  <signature>{merchant_id}</signature>
  <invoice currency="{currency}" amount="{amount}">
    <details>{details}</details>
    <contact>
      <lastName>{last_name}</lastName>
      <firstName>{first_name}</firstName>
      <email>{email}</email>
      <mobilePhone>{phone}</mobilePhone>
      <address/>
    </contact>
  </invoice>
  <params>
    <param>
      <name>{param_name}</name>
      <value>{booking}</value>
    </param>
  </params>
  <url>
    <confirm>{confirm_url}</confirm>
    <return>{return_url}</return>
  </url>
</order>"#,
        order_id = escape(params.order_id.as_str()),
        timestamp = timestamp.format(TIMESTAMP_FORMAT),
        merchant_id = escape(merchant_id),
        currency = escape(params.currency.as_str()),
        amount = params.amount.to_wire(),
        details = escape(params.details.as_str()),
        last_name = escape(contact.last_name.as_str()),
        first_name = escape(contact.first_name.as_str()),
        email = escape(contact.email.as_deref().unwrap_or_default()),
        phone = escape(contact.phone.as_str()),
        param_name = BOOKING_PARAM,
        booking = booking,
        confirm_url = escape(params.confirm_url.as_str()),
        return_url = escape(params.return_url.as_str()),
    ))
}
