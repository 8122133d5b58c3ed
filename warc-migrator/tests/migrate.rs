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

mod common;

use std::fs;
use std::path::PathBuf;

use fastwarc::digest::sha1_digest;
use fastwarc::WarcRecordType;
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;
use warc_migrator::fixer::{CONFORMS_TO, WARC_FORMAT};
use warc_migrator::{migrate_to_warc, MigrateError, MigrationConfig, Validator};

use common::*;

fn setup(name: &str, data: &[u8]) -> (TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join(name);
    fs::write(&source, data).unwrap();
    let target = dir.path().join("migrated.warc.gz");
    (dir, source, target)
}

fn config() -> MigrationConfig {
    MigrationConfig::default().without_validation()
}

fn warcinfo_text(record: &fastwarc::WarcRecord) -> String {
    String::from_utf8(record.content().to_vec()).unwrap()
}

#[rstest]
#[case::arc_1_0("test.arc", arc_file(0))]
#[case::arc_1_1("test.arc", arc_file(1))]
#[case::arc_gzip("test.arc.gz", arc_file_gzip())]
fn test_migrate_arc(#[case] name: &str, #[case] data: Vec<u8>) {
    let (_dir, source, target) = setup(name, &data);
    let count = migrate_to_warc(&source, &target, &config()).unwrap();
    assert_eq!(count, 4);

    let records = read_records(&target);
    assert_eq!(records.len(), 4);
    assert!(is_per_record_gzip(&target));
    assert!(records.iter().all(|r| r.protocol() == "WARC/1.0"));
    let types: Vec<WarcRecordType> = records.iter().map(|r| r.record_type()).collect();
    assert_eq!(
        types,
        vec![
            WarcRecordType::WarcInfo,
            WarcRecordType::Metadata,
            WarcRecordType::Response,
            WarcRecordType::Resource
        ]
    );

    let warcinfo = &records[0];
    let text = warcinfo_text(warcinfo);
    assert!(text.contains(&format!("conformsTo: {CONFORMS_TO}\r\n")));
    assert!(text.contains(&format!("format: {WARC_FORMAT}\r\n")));
    assert_eq!(
        warcinfo.headers().get("WARC-Filename"),
        Some("migrated.warc.gz".to_string())
    );

    assert_eq!(
        records[1].content_type(),
        Some("application/x-internet-archive".to_string())
    );
    assert!(records[1].content().starts_with(b"filedesc://test.arc "));

    let response = &records[2];
    assert_eq!(response.payload(), b"<p>hello</p>\n");
    assert_eq!(
        response.headers().get("WARC-Payload-Digest"),
        Some(sha1_digest(b"<p>hello</p>\n"))
    );
    assert_eq!(
        response.headers().get("WARC-Target-URI"),
        Some("http://example.com/".to_string())
    );
    assert_eq!(
        response.headers().get("WARC-Warcinfo-ID"),
        records[1].headers().get("WARC-Concurrent-To")
    );
}

#[test]
fn test_migrate_arc_1_1_metadata() {
    let filedesc = arc_filedesc(1);
    let (_dir, source, target) = setup("test.arc", &arc_file(1));
    migrate_to_warc(&source, &target, &config()).unwrap();

    let records = read_records(&target);
    assert_eq!(
        warcinfo_text(&records[0]),
        format!(
            "software: Heritrix 1.14.0\r\noperator: Admin\r\nisPartOf: test-collection\r\n\
description: Test crawl\r\nconformsTo: {CONFORMS_TO}\r\nformat: {WARC_FORMAT}\r\n"
        )
    );
    // Header line, version block and XML, without the record separator
    assert_eq!(records[1].content(), &filedesc[..filedesc.len() - 1]);
}

#[test]
fn test_migrate_arc_missing_length() {
    let mut data = arc_filedesc(0);
    data.extend_from_slice(b"http://example.com/missing 1.2.3.4 20080430204828 text/html\n");
    data.extend_from_slice(HTTP_RESPONSE);
    data.push(b'\n');
    data.extend(arc_record(
        "dns:example.com",
        "20080430204827",
        "text/dns",
        b"example.com. 300 IN A 1.2.3.4\n",
    ));

    let (_dir, source, target) = setup("missing.arc", &data);
    assert_eq!(migrate_to_warc(&source, &target, &config()).unwrap(), 4);

    let records = read_records(&target);
    assert_eq!(records[2].record_type(), WarcRecordType::Response);
    assert_eq!(records[2].content(), HTTP_RESPONSE);
    assert_eq!(records[3].record_type(), WarcRecordType::Resource);
}

#[test]
fn test_migrate_arc_missing_length_without_trailing_newline() {
    let body = b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n<p>x</p>";
    let mut data = arc_filedesc(0);
    data.extend_from_slice(b"http://example.com/missing 1.2.3.4 20080430204828 text/html\n");
    data.extend_from_slice(body);
    data.push(b'\n');
    data.extend(arc_record(
        "http://example.com/",
        "20080430204826",
        "text/html",
        HTTP_RESPONSE,
    ));
    data.extend(arc_record(
        "dns:example.com",
        "20080430204827",
        "text/dns",
        b"example.com. 300 IN A 1.2.3.4\n",
    ));

    let (_dir, source, target) = setup("missing.arc", &data);
    assert_eq!(migrate_to_warc(&source, &target, &config()).unwrap(), 5);

    let records = read_records(&target);
    assert_eq!(records.len(), 5);
    assert_eq!(records[2].content(), body);
    assert_eq!(
        records[3].headers().get("WARC-Target-URI"),
        Some("http://example.com/".to_string())
    );
    assert_eq!(records[4].record_type(), WarcRecordType::Resource);
}

#[rstest]
#[case::plain("test.warc", false)]
#[case::gzip("test.warc.gz", true)]
fn test_migrate_legacy_warc(#[case] name: &str, #[case] gzip: bool) {
    let plain = legacy_warc_file(b"HTTP/1.1 200 OK");
    let data = if gzip {
        let boundary = find_second_record(&plain);
        gzip_members(&[&plain[..boundary], &plain[boundary..]])
    } else {
        plain.clone()
    };

    let (_dir, source, target) = setup(name, &data);
    assert_eq!(migrate_to_warc(&source, &target, &config()).unwrap(), 2);

    let records = read_records(&target);
    assert_eq!(records.len(), 2);
    assert!(is_per_record_gzip(&target));
    assert_eq!(
        warcinfo_text(&records[0]),
        format!(
            "software: Heritrix 1.12.1\r\nhostname: crawling017.archive.org\r\noperator: IA\r\n\
conformsTo: {CONFORMS_TO}\r\nformat: {WARC_FORMAT}\r\n"
        )
    );
    assert_eq!(records[1].protocol(), "WARC/1.0");
    assert_eq!(
        records[1].headers().get("WARC-Payload-Digest"),
        Some(sha1_digest(b"<p>hello</p>\n"))
    );
}

fn find_second_record(data: &[u8]) -> usize {
    data.windows(9)
        .enumerate()
        .skip(1)
        .find(|(_, w)| *w == b"WARC/0.17")
        .map(|(i, _)| i)
        .unwrap()
}

#[test]
fn test_migrate_single_member_gzip() {
    let mut plain = legacy_warc_file(b"HTTP/1.1 200 OK");
    plain.extend(warc_record("WARC/0.17", "resource", "text/plain", b"extra"));
    let (_dir, source, target) = setup("single.warc.gz", &gzip_single(&plain));

    assert_eq!(migrate_to_warc(&source, &target, &config()).unwrap(), 3);
    let records = read_records(&target);
    assert_eq!(records.len(), 3);
    assert!(is_per_record_gzip(&target));
    assert_eq!(records[2].content(), b"extra");
}

#[test]
fn test_migrate_meta_overrides() {
    let config = config()
        .with_meta("operator", "Jane")
        .with_meta("operator", "John")
        .with_meta("isPartOf", "collection");
    let (_dir, source, target) = setup("test.warc", &legacy_warc_file(b"HTTP/1.1 200 OK"));
    migrate_to_warc(&source, &target, &config).unwrap();

    let records = read_records(&target);
    assert_eq!(
        warcinfo_text(&records[0]),
        format!(
            "software: Heritrix 1.12.1\r\nhostname: crawling017.archive.org\r\n\
operator: Jane\r\noperator: John\r\nconformsTo: {CONFORMS_TO}\r\nformat: {WARC_FORMAT}\r\n\
isPartOf: collection\r\n"
        )
    );
}

#[test]
fn test_user_fields_apply_after_forced_fields() {
    let config = config().with_meta("format", "WARC File Format 0.17");
    let (_dir, source, target) = setup("test.warc", &legacy_warc_file(b"HTTP/1.1 200 OK"));
    migrate_to_warc(&source, &target, &config).unwrap();
    let text = warcinfo_text(&read_records(&target)[0]);
    assert!(text.contains("format: WARC File Format 0.17\r\n"));
    assert_eq!(text.matches("format:").count(), 1);
}

#[test]
fn test_refuse_existing_target() {
    let (_dir, source, target) = setup("test.warc", &legacy_warc_file(b"HTTP/1.1 200 OK"));
    fs::write(&target, b"keep me").unwrap();
    let err = migrate_to_warc(&source, &target, &config()).unwrap_err();
    assert!(matches!(err, MigrateError::TargetExists(_)));
    assert_eq!(fs::read(&target).unwrap(), b"keep me");
}

#[test]
fn test_refuse_empty_source() {
    let (_dir, source, target) = setup("empty.warc", b"");
    let err = migrate_to_warc(&source, &target, &config()).unwrap_err();
    assert!(matches!(err, MigrateError::EmptySource(_)));
    assert!(!target.exists());
}

#[test]
fn test_non_ascii_reason_phrase() {
    let (_dir, source, target) = setup(
        "test.warc",
        &legacy_warc_file("HTTP/1.1 200 Hyvä".as_bytes()),
    );
    migrate_to_warc(&source, &target, &config()).unwrap();

    let records = read_records(&target);
    let reason = records[1].http_headers().unwrap().reason_phrase().unwrap();
    assert_eq!(reason, "Hyv%C3%A4");
    assert_eq!(urlencoding::decode(&reason).unwrap(), "Hyvä");
    assert_eq!(records[1].payload(), b"<p>hello</p>\n");
}

#[test]
fn test_failed_run_removes_target() {
    let mut data = legacy_warc_file(b"HTTP/1.1 200 OK");
    data.extend_from_slice(b"WARC/0.17\r\nWARC-Type: resource\r\nContent-Length: 100\r\n\r\nshort");
    let (_dir, source, target) = setup("truncated.warc", &data);
    let err = migrate_to_warc(&source, &target, &config()).unwrap_err();
    assert!(matches!(err, MigrateError::Archive(_)));
    assert!(!target.exists());
}

#[cfg(unix)]
#[test]
fn test_validators() {
    let passing = Validator::new("passing", "sh", &["-c", "test -s \"$0\""]);
    let config = MigrationConfig::default().with_validators(vec![passing.clone()]);
    let (dir, source, target) = setup("test.warc", &legacy_warc_file(b"HTTP/1.1 200 OK"));
    assert_eq!(migrate_to_warc(&source, &target, &config).unwrap(), 2);

    let failing = Validator::new("failing", "sh", &["-c", "echo invalid; exit 1"]);
    let config = MigrationConfig::default().with_validators(vec![passing, failing]);
    let second = dir.path().join("second.warc.gz");
    let err = migrate_to_warc(&source, &second, &config).unwrap_err();
    match err {
        MigrateError::Validation { tool, output } => {
            assert_eq!(tool, "failing");
            assert!(output.contains("returncode 1"));
            assert!(output.contains("invalid"));
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(second.exists());
}
