//! Encoding and decoding of payment-request URIs.
//!
//! Both directions are pure functions: no I/O, no clocks, no shared state.
//! Anything that needs the network (mint decimals, account existence) is
//! resolved by the caller beforehand and handed in.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use super::error::UriError;
use super::request::TransferRequest;
use crate::address::Address;
use crate::amount::DecimalAmount;
use crate::config::{
    DEFAULT_TOKEN_DECIMALS, MAX_FRACTION_DIGITS, MAX_URI_LENGTH, NATIVE_DECIMALS, PARAM_AMOUNT,
    PARAM_LABEL, PARAM_MEMO, PARAM_MESSAGE, PARAM_REFERENCE, PARAM_SPL_TOKEN, URI_SCHEME,
};

/// ASCII digits only: the `regex` crate's `\d` would also admit other
/// scripts' digits.
static AMOUNT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("amount pattern is valid"));

// ---------------------------------------------------------------------------
// Decimals Lookup
// ---------------------------------------------------------------------------

/// Already-resolved mint decimals, consulted while decoding.
///
/// Implemented for any `Fn(&Address) -> Option<u8>`, so a closure over a
/// cache works. `None` falls back to the default of 9.
pub trait DecimalsLookup {
    fn decimals(&self, mint: &Address) -> Option<u8>;
}

impl<F> DecimalsLookup for F
where
    F: Fn(&Address) -> Option<u8>,
{
    fn decimals(&self, mint: &Address) -> Option<u8> {
        self(mint)
    }
}

/// Lookup that knows nothing.
struct NoLookup;

impl DecimalsLookup for NoLookup {
    fn decimals(&self, _mint: &Address) -> Option<u8> {
        None
    }
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encode a request as a payment URI.
///
/// The amount is written as a plain decimal with at most
/// `min(9, decimals)` fractional digits (rounded half-up if the request
/// carries more), where `decimals` is the mint's for token requests and 9
/// for the native asset. An amount that rounds to zero cannot be encoded.
/// Text fields are percent-encoded.
///
/// # Example
///
/// ```
/// use tapay_protocol::uri::{encode, TransferRequest};
///
/// let recipient = "11111111111111111111111111111112";
/// let req = TransferRequest::native(recipient, "1.5".parse().unwrap());
/// assert_eq!(encode(&req).unwrap(), format!("solana:{recipient}?amount=1.5"));
/// ```
pub fn encode(request: &TransferRequest) -> Result<String, UriError> {
    if request.recipient.is_empty() {
        return Err(UriError::Encoding("recipient is empty".to_string()));
    }

    let decimals = if request.is_token() {
        request.token_decimals
    } else {
        NATIVE_DECIMALS
    };
    let amount = request
        .amount
        .round_dp(MAX_FRACTION_DIGITS.min(decimals as usize));
    if amount.is_zero() {
        return Err(UriError::Encoding(format!(
            "amount {} rounds to zero at {decimals} decimals",
            request.amount
        )));
    }

    let mut uri = format!(
        "{URI_SCHEME}:{}?{PARAM_AMOUNT}={amount}",
        request.recipient
    );
    if let Some(mint) = &request.spl_token {
        push_param(&mut uri, PARAM_SPL_TOKEN, mint);
    }
    for reference in &request.references {
        push_param(&mut uri, PARAM_REFERENCE, reference);
    }
    for (name, value) in [
        (PARAM_LABEL, &request.label),
        (PARAM_MESSAGE, &request.message),
        (PARAM_MEMO, &request.memo),
    ] {
        if let Some(text) = value {
            push_param(&mut uri, name, &urlencoding::encode(text));
        }
    }

    if uri.len() > MAX_URI_LENGTH {
        return Err(UriError::Encoding(format!(
            "encoded URI is {} bytes, limit is {MAX_URI_LENGTH}",
            uri.len()
        )));
    }
    Ok(uri)
}

fn push_param(uri: &mut String, name: &str, value: &str) {
    uri.push('&');
    uri.push_str(name);
    uri.push('=');
    uri.push_str(value);
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decode a payment URI. Token decimals default to 9.
pub fn decode(uri: &str) -> Result<TransferRequest, UriError> {
    decode_with_decimals(uri, &NoLookup)
}

/// Decode a payment URI, resolving token decimals through `lookup`.
///
/// Validation order, first failure wins:
///
/// 1. size limit
/// 2. scheme
/// 3. recipient present
/// 4. recipient is an address
/// 5. amount present, positive, plain decimal, at most 9 fractional digits
/// 6. `spl-token` is an address
/// 7. every `reference` is an address
/// 8. `label` / `message` / `memo` percent-decode to UTF-8
/// 9. amount precision fits the resolved decimals
pub fn decode_with_decimals<L>(uri: &str, lookup: &L) -> Result<TransferRequest, UriError>
where
    L: DecimalsLookup + ?Sized,
{
    if uri.len() > MAX_URI_LENGTH {
        return Err(UriError::InputTooLarge(uri.len()));
    }

    let (scheme, rest) = uri
        .split_once(':')
        .ok_or_else(|| UriError::SchemeMismatch(String::new()))?;
    if !scheme.eq_ignore_ascii_case(URI_SCHEME) {
        return Err(UriError::SchemeMismatch(scheme.to_string()));
    }

    let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, query),
        None => (rest, ""),
    };
    let recipient = path.strip_prefix("//").unwrap_or(path);
    if recipient.is_empty() {
        return Err(UriError::RecipientMissing);
    }
    Address::parse(recipient).map_err(UriError::RecipientInvalid)?;

    let params: Vec<(&str, &str)> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .collect();
    let values = |name: &str| param_values(&params, name);

    let amount = parse_amount(&values(PARAM_AMOUNT))?;

    let spl_token = match values(PARAM_SPL_TOKEN).as_slice() {
        [] => None,
        [mint] => {
            let mint = Address::parse(mint).map_err(|e| UriError::SplTokenInvalid(e.to_string()))?;
            Some(mint)
        }
        _ => return Err(UriError::SplTokenInvalid("repeated parameter".to_string())),
    };

    let references = values(PARAM_REFERENCE)
        .into_iter()
        .enumerate()
        .map(|(index, reference)| {
            Address::parse(reference)
                .map(|_| reference.to_string())
                .map_err(|reason| UriError::ReferenceInvalid { index, reason })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let text = |field: &'static str| -> Result<Option<String>, UriError> {
        values(field)
            .first()
            .map(|raw| {
                urlencoding::decode(raw)
                    .map(|decoded| decoded.into_owned())
                    .map_err(|_| UriError::TextInvalid { field })
            })
            .transpose()
    };
    let label = text(PARAM_LABEL)?;
    let message = text(PARAM_MESSAGE)?;
    let memo = text(PARAM_MEMO)?;

    let token_decimals = match &spl_token {
        Some(mint) => lookup.decimals(mint).unwrap_or(DEFAULT_TOKEN_DECIMALS),
        None => NATIVE_DECIMALS,
    };
    if amount.fraction_digits() > token_decimals as usize {
        return Err(UriError::AmountInvalid(format!(
            "{amount} has more precision than the asset's {token_decimals} decimals"
        )));
    }

    trace!(
        recipient,
        %amount,
        token = spl_token.is_some(),
        references = references.len(),
        "decoded payment request"
    );

    Ok(TransferRequest {
        recipient: recipient.to_string(),
        amount,
        spl_token: spl_token.map(|mint| mint.to_string()),
        token_decimals,
        references,
        label,
        message,
        memo,
    })
}

fn param_values<'a>(params: &[(&'a str, &'a str)], name: &str) -> Vec<&'a str> {
    params
        .iter()
        .filter(|(key, _)| *key == name)
        .map(|(_, value)| *value)
        .collect()
}

fn parse_amount(values: &[&str]) -> Result<DecimalAmount, UriError> {
    let raw = match values {
        [] => return Err(UriError::AmountMissing),
        [raw] => *raw,
        _ => return Err(UriError::AmountInvalid("repeated parameter".to_string())),
    };
    if !AMOUNT_PATTERN.is_match(raw) {
        return Err(UriError::AmountInvalid(format!("{raw:?} is not a plain decimal")));
    }
    let amount =
        DecimalAmount::parse(raw).map_err(|e| UriError::AmountInvalid(e.to_string()))?;
    if amount.is_zero() {
        return Err(UriError::AmountInvalid("amount must be greater than zero".to_string()));
    }
    if amount.fraction_digits() > MAX_FRACTION_DIGITS {
        return Err(UriError::AmountInvalid(format!(
            "{raw} has more than {MAX_FRACTION_DIGITS} fractional digits"
        )));
    }
    Ok(amount)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
