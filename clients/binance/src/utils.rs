use hmac::{Hmac, Mac};
use reqwest::Method;
use sha2::Sha256;
use url::form_urlencoded;

use crate::error::{BinanceError, Result};
use crate::types::ApiErrorBody;

type HmacSha256 = Hmac<Sha256>;

fn timestamp_ms() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}

/// Lowercase hex HMAC-SHA256 of `payload` keyed with the API secret.
fn sign_query(api_secret: &str, payload: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(api_secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Form-encodes `params` and appends `signature`, computed over exactly that encoding.
pub(crate) fn sign_params(api_secret: &str, params: &[(&str, String)]) -> String {
    let query = params
        .iter()
        .fold(form_urlencoded::Serializer::new(String::new()), |mut ser, (key, value)| {
            ser.append_pair(key, value);
            ser
        })
        .finish();
    let signature = sign_query(api_secret, &query);
    format!("{query}&signature={signature}")
}

/// Turns a raw response into the body text, or the Binance error it carries.
pub(crate) fn check_response(status: reqwest::StatusCode, body: String) -> Result<String> {
    if let Ok(err) = serde_json::from_str::<ApiErrorBody>(&body) {
        if err.code < 0 {
            return Err(BinanceError::Api {
                code: err.code,
                msg: err.msg,
            });
        }
    }
    if !status.is_success() {
        return Err(BinanceError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

/// Signed request for USD-M futures (fapi).
///
/// - base_url: e.g. "https://fapi.binance.com"
/// - path: e.g. "/fapi/v3/positionRisk" or "/fapi/v1/order"
/// - params: without signature; timestamp/recvWindow are added if missing.
///
/// GET sends the signed query in the URL; POST and DELETE send it as an
/// application/x-www-form-urlencoded body.
pub async fn fapi_signed_request(
    client: &reqwest::Client,
    base_url: &str,
    path: &str,
    method: Method,
    api_key: &str,
    api_secret: &str,
    recv_window: u64,
    mut params: Vec<(&str, String)>,
) -> Result<String> {
    if !params.iter().any(|(k, _)| *k == "timestamp") {
        params.push(("timestamp", timestamp_ms()));
    }
    if !params.iter().any(|(k, _)| *k == "recvWindow") {
        params.push(("recvWindow", recv_window.to_string()));
    }

    let signed_query = sign_params(api_secret, &params);

    let url = format!("{}{}", base_url, path);
    let req = if method == Method::GET {
        client.get(format!("{}?{}", url, signed_query))
    } else {
        client
            .request(method, url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(signed_query)
    };

    let resp = req.header("X-MBX-APIKEY", api_key).send().await?;
    let status = resp.status();
    let body = resp.text().await?;
    check_response(status, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signs_documented_example() {
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            sign_query(secret, query),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn signature_is_appended_after_encoded_params() {
        let params = vec![("symbol", "ETHUSDT".to_string()), ("side", "SELL".to_string())];
        let signed = sign_params("secret", &params);
        assert!(signed.starts_with("symbol=ETHUSDT&side=SELL&signature="));
        assert_eq!(signed.rsplit('=').next().map(str::len), Some(64));
    }

    #[test]
    fn error_body_becomes_api_error() {
        let body = r#"{"code":-2019,"msg":"Margin is insufficient."}"#.to_string();
        let err = check_response(reqwest::StatusCode::BAD_REQUEST, body).unwrap_err();
        match err {
            BinanceError::Api { code, msg } => {
                assert_eq!(code, -2019);
                assert_eq!(msg, "Margin is insufficient.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn success_body_passes_through() {
        let body = r#"{"code":200,"msg":"success"}"#.to_string();
        assert!(check_response(reqwest::StatusCode::OK, body).is_ok());
    }

    #[test]
    fn gateway_errors_without_json_are_transient() {
        let err = check_response(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "Too Many Requests".to_string(),
        )
        .unwrap_err();
        assert!(matches!(err, BinanceError::Status { status: 429, .. }));
        assert!(err.is_transient());

        let err = check_response(
            reqwest::StatusCode::BAD_GATEWAY,
            "<html>502 Bad Gateway</html>".to_string(),
        )
        .unwrap_err();
        assert!(err.is_transient());
    }
}
