use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const MIB: usize = 1024 * 1024;

pub fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 253) as u8).collect()
}

/// Answers `Range: bytes=a-b` with 206 and the slice, anything else with 200.
pub struct RangeResponder(pub Vec<u8>);

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let len = self.0.len();
        let range = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("bytes="))
            .and_then(|v| v.split_once('-'))
            .and_then(|(s, e)| Some((s.parse::<usize>().ok()?, e.parse::<usize>().ok())));
        match range {
            Some((start, end)) => {
                let end = end.unwrap_or(len - 1).min(len - 1);
                ResponseTemplate::new(206)
                    .set_body_bytes(self.0[start..=end].to_vec())
                    .insert_header("content-range", format!("bytes {start}-{end}/{len}").as_str())
            }
            None => ResponseTemplate::new(200).set_body_bytes(self.0.clone()),
        }
    }
}

/// Server whose HEAD advertises the body's size, optionally with range support.
pub async fn serve(data: Vec<u8>, ranged: bool) -> MockServer {
    let server = MockServer::start().await;
    let mut head = ResponseTemplate::new(200).set_body_bytes(data.clone());
    if ranged {
        head = head.insert_header("accept-ranges", "bytes");
    }
    Mock::given(method("HEAD"))
        .respond_with(head)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(RangeResponder(data))
        .mount(&server)
        .await;
    server
}
