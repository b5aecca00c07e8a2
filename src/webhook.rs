use std::{cmp::Ordering, fmt::Write, sync::Arc};

use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha512;

use crate::{entity::sea_orm_active_enums::TransactionStatus, error::AppError, gateway::id_string};

type HmacSha512 = Hmac<Sha512>;

/// Header carrying the hex HMAC-SHA512 of the canonical body.
pub const SIGNATURE_HEADER: &str = "x-nowpayments-sig";

/// Serializes `value` with object keys sorted at every depth, byte for byte
/// as the gateway's `JSON.stringify` over a key-sorted object emits it.
/// Arrays keep their element order. Numbers use ECMAScript `Number::toString`
/// formatting, so `0.000005` stays `0.000005` and `1e21` becomes `1e+21`.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    let mut out = String::new();
    write_canonical(&mut out, value);
    out.into_bytes()
}

fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => match n.as_f64() {
            Some(v) => out.push_str(&js_number(v)),
            None => out.push_str("null"),
        },
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, key) in sorted_keys(map).into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_canonical(out, &map[key]);
            }
            out.push('}');
        }
    }
}

/// Lexicographic by UTF-16 code unit, except that array-index keys
/// ("0", "1", ..) come first in numeric order, as JS objects enumerate them.
fn sorted_keys(map: &Map<String, Value>) -> Vec<&String> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort_by(|a, b| match (array_index(a), array_index(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.encode_utf16().cmp(b.encode_utf16()),
    });
    keys
}

fn array_index(key: &str) -> Option<u32> {
    let index: u32 = key.parse().ok()?;
    (index != u32::MAX && index.to_string() == key).then_some(index)
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if u32::from(c) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// ECMAScript `Number::toString(10)` for a finite double.
fn js_number(v: f64) -> String {
    if !v.is_finite() {
        return "null".into();
    }
    if v == 0.0 {
        return "0".into();
    }
    if v < 0.0 {
        return format!("-{}", js_number(-v));
    }

    // `{:e}` yields the shortest round-tripping digits, e.g. "5.077125051e9".
    let sci = format!("{v:e}");
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let n = exponent + 1;

    if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{int}.{frac}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let e = n - 1;
        let sign = if e < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{first}e{sign}{}", e.abs())
        } else {
            format!("{first}.{rest}e{sign}{}", e.abs())
        }
    }
}

/// Keyed with the IPN shared secret; checks notification signatures.
#[derive(Clone)]
pub struct IpnVerifier {
    keyed: Arc<HmacSha512>,
}

impl IpnVerifier {
    pub fn new(secret: &str) -> anyhow::Result<Self> {
        let keyed = <HmacSha512 as Mac>::new_from_slice(secret.as_bytes())
            .map_err(|_| anyhow::anyhow!("invalid IPN secret"))?;
        Ok(Self {
            keyed: Arc::new(keyed),
        })
    }

    fn mac(&self) -> HmacSha512 {
        self.keyed.as_ref().clone()
    }

    /// Hex signature over the canonical form of `value`.
    pub fn sign(&self, value: &Value) -> String {
        let mut mac = self.mac();
        mac.update(&canonical_bytes(value));
        hex::encode(mac.finalize().into_bytes())
    }

    /// Parses the raw body and checks `signature` against its canonical form.
    /// Returns the parsed document only when the signature matches.
    pub fn verify(&self, raw_body: &[u8], signature: Option<&str>) -> Result<Value, AppError> {
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(AppError::InvalidSignature)?;
        let expected = hex::decode(signature).map_err(|_| AppError::InvalidSignature)?;

        let value: Value = serde_json::from_slice(raw_body).map_err(|_| AppError::InvalidSignature)?;

        let mut mac = self.mac();
        mac.update(&canonical_bytes(&value));
        mac.verify_slice(&expected)
            .map_err(|_| AppError::InvalidSignature)?;

        Ok(value)
    }
}

/// Fields of an IPN notification the reconciliation consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct IpnPayload {
    pub payment_id: String,
    pub order_id: String,
    pub payment_status: String,
    pub price_amount: f64,
    pub actually_paid: Option<f64>,
    pub pay_currency: Option<String>,
}

impl IpnPayload {
    pub fn status(&self) -> TransactionStatus {
        TransactionStatus::from_gateway(&self.payment_status)
    }
}

impl TryFrom<&Value> for IpnPayload {
    type Error = AppError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let payment_id = value
            .get("payment_id")
            .and_then(id_string)
            .ok_or_else(|| AppError::MalformedWebhook("payment_id".into()))?;
        let order_id = value
            .get("order_id")
            .and_then(id_string)
            .ok_or_else(|| AppError::MalformedWebhook("order_id".into()))?;
        let payment_status = value
            .get("payment_status")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::MalformedWebhook("payment_status".into()))?
            .to_string();
        let price_amount = value
            .get("price_amount")
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .ok_or_else(|| AppError::MalformedWebhook("price_amount".into()))?;

        let actually_paid = match value.get("actually_paid") {
            None | Some(Value::Null) => None,
            Some(v) => Some(
                v.as_f64()
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .ok_or_else(|| AppError::MalformedWebhook("actually_paid".into()))?,
            ),
        };
        let pay_currency = value
            .get("pay_currency")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_ascii_uppercase);

        Ok(Self {
            payment_id,
            order_id,
            payment_status,
            price_amount,
            actually_paid,
            pay_currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_form_sorts_nested_keys_and_keeps_arrays() {
        let value: Value = serde_json::from_str(
            r#"{"b":1,"a":{"d":[3,1,{"z":1,"y":2}],"c":null}}"#,
        )
        .unwrap();
        let bytes = canonical_bytes(&value);
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"a":{"c":null,"d":[3,1,{"y":2,"z":1}]},"b":1}"#
        );
    }

    #[test]
    fn numbers_are_written_like_javascript() {
        let cases = [
            (0.000005, "0.000005"),
            (0.000001, "0.000001"),
            (1.5e-7, "1.5e-7"),
            (0.52, "0.52"),
            (50.0, "50"),
            (-0.5, "-0.5"),
            (-0.0, "0"),
            (5077125051.0, "5077125051"),
            (1e20, "100000000000000000000"),
            (1e21, "1e+21"),
            (1.2e22, "1.2e+22"),
            (123.456, "123.456"),
        ];
        for (value, expected) in cases {
            assert_eq!(js_number(value), expected, "{value:e}");
        }
    }

    #[test]
    fn gateway_signed_bodies_verify() {
        let verifier = IpnVerifier::new("ipn-secret").unwrap();

        let small = br#"{"payment_id":"1","order_id":"o","payment_status":"finished","price_amount":50,"actually_paid":0.000005}"#;
        let small_sig = "b115e8cca7f0262a55a56245d93fee15994904325fe52703808bcb7859b477a79f0105f83cc69a7c23724a191872b021909bf9596a01917a973f296cd18cb9c6";
        let value: Value = serde_json::from_slice(small).unwrap();
        assert_eq!(
            String::from_utf8(canonical_bytes(&value)).unwrap(),
            r#"{"actually_paid":0.000005,"order_id":"o","payment_id":"1","payment_status":"finished","price_amount":50}"#
        );
        assert!(verifier.verify(small, Some(small_sig)).is_ok());

        let nested = r#"{"payment_status":"finished","payment_id":5077125051,"order_id":"order_1_x","price_amount":50,"actually_paid":0.52,"pay_currency":"ltc","fee":{"withdrawalFee":0.0000012,"depositFee":1e21,"currency":"ltc"},"outcome_amount":1.5e-7,"purchase_id":"6084744717","batch":[3,1,{"z":1,"y":2.50}],"note":"tab\there \"q\" é"}"#.as_bytes();
        let nested_sig = "861c08067f5c44c68b63ca7cbcb64ae343b48d05dcf585be482bdb8bd151226255319a49e2e96a573b4fa8b81c5926b66e7aa531305a14a9c91092ca3ebd2311";
        let value: Value = serde_json::from_slice(nested).unwrap();
        assert_eq!(
            String::from_utf8(canonical_bytes(&value)).unwrap(),
            r#"{"actually_paid":0.52,"batch":[3,1,{"y":2.5,"z":1}],"fee":{"currency":"ltc","depositFee":1e+21,"withdrawalFee":0.0000012},"note":"tab\there \"q\" é","order_id":"order_1_x","outcome_amount":1.5e-7,"pay_currency":"ltc","payment_id":5077125051,"payment_status":"finished","price_amount":50,"purchase_id":"6084744717"}"#
        );
        assert!(verifier.verify(nested, Some(nested_sig)).is_ok());
    }

    #[test]
    fn index_like_keys_enumerate_first() {
        let raw = br#"{"b":{"10":"x","9":"y","a":-0.0,"B":100}}"#;
        let value: Value = serde_json::from_slice(raw).unwrap();
        assert_eq!(
            String::from_utf8(canonical_bytes(&value)).unwrap(),
            r#"{"b":{"9":"y","10":"x","B":100,"a":0}}"#
        );
        let verifier = IpnVerifier::new("ipn-secret").unwrap();
        let sig = "5c3e3f6dc1036256369f57e85a783cff35671f87f1fb99de386daa536533f5ba1f8a07970219155d67b00b2d5449784d03123b4953560e356ee8c58c180886b9";
        assert!(verifier.verify(raw, Some(sig)).is_ok());
    }

    #[test]
    fn signature_survives_key_reordering_but_not_value_changes() {
        let verifier = IpnVerifier::new("ipn-secret").unwrap();
        let signed = json!({"payment_id": "1", "price_amount": 50, "payment_status": "finished"});
        let sig = verifier.sign(&signed);

        let reordered = br#"{"payment_status":"finished","price_amount":50,"payment_id":"1"}"#;
        assert!(verifier.verify(reordered, Some(&sig)).is_ok());

        let tampered = br#"{"payment_status":"finished","price_amount":51,"payment_id":"1"}"#;
        assert!(matches!(
            verifier.verify(tampered, Some(&sig)),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn missing_or_foreign_signatures_are_rejected() {
        let verifier = IpnVerifier::new("ipn-secret").unwrap();
        let body = br#"{"payment_id":"1"}"#;
        let foreign = IpnVerifier::new("other").unwrap().sign(&json!({"payment_id": "1"}));

        assert!(verifier.verify(body, None).is_err());
        assert!(verifier.verify(body, Some("")).is_err());
        assert!(verifier.verify(body, Some("zz-not-hex")).is_err());
        assert!(verifier.verify(body, Some(&foreign)).is_err());
        assert!(verifier.verify(b"not json", Some(&foreign)).is_err());
    }

    #[test]
    fn payload_requires_core_fields() {
        let ok = json!({
            "payment_id": 5077125051u64,
            "order_id": "order_1_x",
            "payment_status": "finished",
            "price_amount": 50,
            "actually_paid": 0.52,
            "pay_currency": "ltc"
        });
        let payload = IpnPayload::try_from(&ok).unwrap();
        assert_eq!(payload.payment_id, "5077125051");
        assert_eq!(payload.actually_paid, Some(0.52));
        assert_eq!(payload.pay_currency.as_deref(), Some("LTC"));
        assert_eq!(payload.status(), TransactionStatus::Completed);

        for field in ["payment_id", "order_id", "payment_status", "price_amount"] {
            let mut broken = ok.clone();
            broken.as_object_mut().unwrap().remove(field);
            assert!(
                matches!(IpnPayload::try_from(&broken), Err(AppError::MalformedWebhook(f)) if f == field),
                "{field}"
            );
        }

        let mut textual_price = ok.clone();
        textual_price["price_amount"] = json!("50");
        assert!(IpnPayload::try_from(&textual_price).is_err());
    }

    #[test]
    fn unknown_statuses_are_accepted_as_unknown() {
        let payload = IpnPayload::try_from(&json!({
            "payment_id": "9",
            "order_id": "o",
            "payment_status": "partially_paid",
            "price_amount": 10.0
        }))
        .unwrap();
        assert_eq!(payload.status(), TransactionStatus::Unknown);
        assert_eq!(payload.actually_paid, None);
    }
}
