// Copyright 2025 Janek Bevendorff
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP message helpers.
//!
//! Only as much of HTTP/1.x is understood as is needed to locate the header
//! block inside a record and to decide whether a captured blob is a complete
//! HTTP response.

use std::io::Cursor;

use memchr::memmem;

use crate::record::{parse_header_block, trim_line_ending, HeaderEncoding, HeaderMap};

/// Length of the HTTP header block at the start of `content`, including the
/// terminating empty line. Returns `None` if no empty line is found.
pub fn header_block_len(content: &[u8]) -> Option<usize> {
    let crlf = memmem::find(content, b"\r\n\r\n").map(|pos| pos + 4);
    let lf = memmem::find(content, b"\n\n").map(|pos| pos + 2);
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Check whether `content` is one complete HTTP response with no bytes left over.
///
/// An empty `Content-Length` header is always ignored. With
/// `ignore_content_length` set, a non-empty one is ignored as well and the body
/// is assumed to run to the end of `content`.
pub fn is_http_response(content: &[u8], ignore_content_length: bool) -> bool {
    if !content.starts_with(b"HTTP/") {
        return false;
    }
    let Some(block_len) = header_block_len(content) else {
        return false;
    };

    let mut headers = HeaderMap::new(HeaderEncoding::Latin1);
    let mut cursor = Cursor::new(&content[..block_len]);
    if parse_header_block(&mut cursor, &mut headers, true).is_err() {
        return false;
    }
    let Some(status) = headers.status_code() else {
        return false;
    };

    let body = &content[block_len..];
    if (100..200).contains(&status) || status == 204 || status == 304 {
        return body.is_empty();
    }

    let chunked = headers
        .get("Transfer-Encoding")
        .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"));
    if chunked {
        return chunked_body_len(body) == Some(body.len());
    }

    match headers.get("Content-Length").map(|v| v.trim().to_string()) {
        Some(length) if !length.is_empty() && !ignore_content_length => {
            match length.parse::<usize>() {
                Ok(length) => body.len() == length,
                Err(_) => false,
            }
        }
        _ => true,
    }
}

/// Length of a complete chunked body including trailers, or `None` if it is incomplete.
fn chunked_body_len(body: &[u8]) -> Option<usize> {
    let mut pos = 0;
    loop {
        let line_end = memchr::memchr(b'\n', &body[pos..])? + pos + 1;
        let size_line = trim_line_ending(&body[pos..line_end]);
        let size_field = size_line
            .split(|&b| b == b';')
            .next()
            .unwrap_or_default()
            .trim_ascii();
        let size = usize::from_str_radix(std::str::from_utf8(size_field).ok()?, 16).ok()?;
        pos = line_end;

        if size == 0 {
            // Trailer section ends with an empty line
            loop {
                let line_end = memchr::memchr(b'\n', &body[pos..])? + pos + 1;
                let empty = trim_line_ending(&body[pos..line_end]).is_empty();
                pos = line_end;
                if empty {
                    return Some(pos);
                }
            }
        }

        let chunk_end = pos.checked_add(size)?;
        if body.len() < chunk_end {
            return None;
        }
        pos = chunk_end;
        let rest = &body[pos..];
        if rest.starts_with(b"\r\n") {
            pos += 2;
        } else if rest.starts_with(b"\n") {
            pos += 1;
        } else {
            return None;
        }
    }
}
