//! Canned HTTP responses on localhost, for exercising the token endpoint and
//! Drive calls without the network.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use crate::model::storage::Credentials;

#[derive(Debug)]
pub struct Recorded {
    pub request_line: String,
    pub headers: Vec<String>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<String> {
        let prefix = format!("{}:", name.to_ascii_lowercase());
        self.headers.iter()
            .find(|h| h.to_ascii_lowercase().starts_with(&prefix))
            .map(|h| h[prefix.len()..].trim().to_owned())
    }
}

/// Answer one connection per response, in order, then hand back what was received.
pub fn serve(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<Recorded>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        responses.into_iter().map(|(status, response)| {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(&stream);
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut headers = vec![];
            let mut length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end().to_owned();
                if line.is_empty() {
                    break;
                }
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    length = value.trim().parse().unwrap();
                }
                headers.push(line);
            }
            let mut body = vec![0; length];
            reader.read_exact(&mut body).unwrap();
            let mut writer = &stream;
            write!(
                writer,
                "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status, response.len(), response,
            ).unwrap();
            writer.flush().unwrap();
            Recorded {
                request_line: request_line.trim_end().to_owned(),
                headers,
                body: String::from_utf8(body).unwrap(),
            }
        }).collect()
    });
    (base, handle)
}

pub fn credentials(token_uri: &str) -> Credentials {
    Credentials {
        access_token: "old-access".to_owned(),
        refresh_token: Some("refresh".to_owned()),
        token_expiry: None,
        token_uri: token_uri.to_owned(),
        client_id: "client".to_owned(),
        client_secret: "secret".to_owned(),
        scopes: vec![],
        user_agent: None,
        invalid: false,
    }
}
