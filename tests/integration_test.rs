use fpff::archive::{Fpff, FpffOptions};
use fpff::codec::{self, DecodeOptions};
use fpff::export::{ExportError, ExportMode, ExportOptions, Exporter};
use fpff::{Container, DecodeError, Error, Section, SectionType};
use proptest::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn mixed_container() -> Container {
    let mut c = Container::with_author("jasmaa").unwrap();
    c.add(SectionType::Ascii, b"Hello, world!".to_vec()).unwrap();
    c.add(SectionType::Utf8, "おはよう世界".as_bytes().to_vec()).unwrap();
    c.add(SectionType::Dwords, vec![0xFFu8; 16]).unwrap();
    c.add(SectionType::Ref, 1u32.to_le_bytes().to_vec()).unwrap();
    c.add(SectionType::Png, b"\x89PNG\r\n\x1a\nfake".to_vec()).unwrap();
    c.add(SectionType::Gif89, b"GIF89a...".to_vec()).unwrap();
    c
}

#[test]
fn test_hello_world_scenario() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("hello_world.fpff");
    let out = tmp.path().join("out");

    let mut doc = Fpff::new();
    doc.add(b"hello world".to_vec(), SectionType::Ascii).unwrap();
    doc.write(&file).unwrap();

    let mut fresh = Fpff::new();
    assert_eq!(fresh.read(&file).unwrap(), 0);
    let report = fresh.export(&out).unwrap();

    assert!(report.is_complete());
    assert_eq!(dir_listing(&out), vec!["section-0.txt"]);
    assert_eq!(fs::read(out.join("section-0.txt")).unwrap(), b"hello world");
}

#[test]
fn test_empty_container_scenario() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("empty.fpff");
    let out = tmp.path().join("nested").join("out");

    Fpff::new().write(&file).unwrap();
    let doc = Fpff::open(&file).unwrap();
    assert_eq!(doc.len(), 0);

    let report = doc.export(&out).unwrap();
    assert!(report.is_complete());
    assert_eq!(report.attempted(), 0);
    assert!(out.is_dir());
    assert!(dir_listing(&out).is_empty());
}

#[test]
fn test_mixed_roundtrip_through_file() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("mixed.fpff");

    let original = mixed_container();
    codec::write_file(&original, &file).unwrap();
    let decoded = codec::read_file(&file, &DecodeOptions::default()).unwrap();

    assert_eq!(decoded.trailing_bytes, 0);
    assert_eq!(decoded.container, original);
    assert_eq!(decoded.container.author.as_str(), "jasmaa");
}

#[test]
fn test_insert_position_survives_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("order.fpff");

    let mut doc = Fpff::from(mixed_container());
    let before: Vec<Section> = doc.container().sections().to_vec();
    doc.insert(2, b"inserted".to_vec(), SectionType::Ascii).unwrap();
    doc.write(&file).unwrap();

    let back = Fpff::open(&file).unwrap();
    let sections = back.container().sections();
    assert_eq!(sections.len(), before.len() + 1);
    assert_eq!(sections[2].data(), b"inserted");
    assert_eq!(&sections[..2], &before[..2]);
    assert_eq!(&sections[3..], &before[2..]);
}

#[test]
fn test_bounds_errors_leave_handle_unchanged() {
    let mut doc = Fpff::from(mixed_container());
    let snapshot = doc.container().clone();
    let len = doc.len();

    let err = doc.insert(len + 1, b"x".to_vec(), SectionType::Ascii).unwrap_err();
    assert_eq!(err.section_index(), Some(len + 1));
    assert!(doc.remove(len).is_err());
    assert!(doc.container().at(len).is_err());
    assert_eq!(doc.container(), &snapshot);
}

#[test]
fn test_export_is_deterministic() {
    let tmp = TempDir::new().unwrap();
    let a = tmp.path().join("a");
    let b = tmp.path().join("b");

    let doc = Fpff::from(mixed_container());
    doc.export(&a).unwrap();
    doc.export(&b).unwrap();

    let names = dir_listing(&a);
    assert_eq!(names, dir_listing(&b));
    assert_eq!(names, vec![
        "section-0.txt",
        "section-1.txt",
        "section-2.bin",
        "section-3.bin",
        "section-4.png",
        "section-5.gif",
    ]);
    for name in &names {
        assert_eq!(fs::read(a.join(name)).unwrap(), fs::read(b.join(name)).unwrap());
    }
}

#[test]
fn test_rendered_export() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("rendered");

    let mut c = Container::new();
    c.add(SectionType::Words, vec![0u8, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
    c.add(SectionType::Ref, 0u32.to_le_bytes().to_vec()).unwrap();

    let exporter = Exporter::new(ExportOptions { mode: ExportMode::Rendered, ..ExportOptions::default() });
    let report = exporter.export(&c, &out).unwrap();

    assert!(report.is_complete());
    assert_eq!(fs::read_to_string(out.join("section-0.txt")).unwrap(), "00000000, ffffffff");
    assert_eq!(fs::read_to_string(out.join("section-1.txt")).unwrap(), "REF: 0");
}

#[test]
fn test_rendered_export_restores_media_signatures() {
    let tmp = TempDir::new().unwrap();
    let raw_out = tmp.path().join("raw");
    let rendered_out = tmp.path().join("rendered");

    // Image bodies stored without their leading signature.
    let ihdr = vec![0u8, 0, 0, 0x0d, b'I', b'H', b'D', b'R', 0, 0, 0, 1];
    let mut c = Container::new();
    c.add(SectionType::Png, ihdr.clone()).unwrap();
    c.add(SectionType::Gif87, vec![0x01u8, 0x00, 0x01, 0x00]).unwrap();
    c.add(SectionType::Gif89, b"GIF89a\x02\x00".to_vec()).unwrap();

    Exporter::default().export(&c, &raw_out).unwrap();
    assert_eq!(fs::read(raw_out.join("section-0.png")).unwrap(), ihdr);

    let exporter = Exporter::new(ExportOptions { mode: ExportMode::Rendered, ..ExportOptions::default() });
    assert!(exporter.export(&c, &rendered_out).unwrap().is_complete());

    let png = fs::read(rendered_out.join("section-0.png")).unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    assert_eq!(&png[8..], &ihdr[..]);
    assert_eq!(fs::read(rendered_out.join("section-1.gif")).unwrap(), b"GIF87a\x01\x00\x01\x00");
    assert_eq!(fs::read(rendered_out.join("section-2.gif")).unwrap(), b"GIF89a\x02\x00");
}

#[test]
fn test_export_keeps_unrelated_files() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    fs::create_dir(&out).unwrap();
    fs::write(out.join("notes.md"), b"keep me").unwrap();

    Fpff::from(mixed_container()).export(&out).unwrap();
    assert_eq!(fs::read(out.join("notes.md")).unwrap(), b"keep me");
    assert_eq!(dir_listing(&out).len(), 7);
}

#[test]
fn test_export_reports_per_index_failures() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    // A directory squatting on section 0's file name makes that write fail.
    fs::create_dir_all(out.join("section-0.txt")).unwrap();

    let doc = Fpff::from(mixed_container());
    let report = doc.export(&out).unwrap();

    assert_eq!(report.failed_indices(), vec![0]);
    assert_eq!(report.written.len(), 5);
    assert_eq!(fs::read(out.join("section-1.txt")).unwrap(), "おはよう世界".as_bytes());
    assert!(matches!(report.into_result(), Err(ExportError::Incomplete(_))));
}

#[test]
fn test_export_names_never_collide() {
    let tmp = TempDir::new().unwrap();
    let c = mixed_container();
    let exporter = Exporter::default();

    // Names carry the index, so a full export never collides.
    let report = exporter.export(&c, tmp.path().join("out")).unwrap();
    assert!(report.is_complete());
    let names: Vec<String> = (0..c.len())
        .map(|i| exporter.file_name(i, c.len(), c.at(i).unwrap().section_type()))
        .collect();
    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), names.len());
}

#[test]
fn test_export_directory_unavailable() {
    let tmp = TempDir::new().unwrap();
    let blocker = tmp.path().join("not_a_dir");
    fs::write(&blocker, b"file").unwrap();

    let err = Fpff::from(mixed_container()).export(&blocker).unwrap_err();
    assert!(matches!(err, Error::Export(ExportError::DirectoryUnavailable { .. })));
}

#[test]
fn test_truncated_file_yields_no_container() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("cut.fpff");

    let bytes = codec::encode_to_vec(&mixed_container()).unwrap();
    fs::write(&file, &bytes[..bytes.len() - 3]).unwrap();

    let mut doc = Fpff::with_author("keep").unwrap();
    doc.add(b"prior".to_vec(), SectionType::Ascii).unwrap();
    let before = doc.container().clone();

    let err = doc.read(&file).unwrap_err();
    assert!(matches!(err, Error::Decode(DecodeError::TruncatedData { index: 5, .. })));
    assert_eq!(doc.container(), &before);
}

#[test]
fn test_bad_magic_rejected() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("bogus.fpff");
    fs::write(&file, b"this is not an fpff file at all").unwrap();

    assert!(matches!(Fpff::open(&file), Err(Error::Decode(DecodeError::MalformedHeader(_)))));
}

#[test]
fn test_trailing_bytes_reported() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("trailing.fpff");

    let mut bytes = codec::encode_to_vec(&mixed_container()).unwrap();
    bytes.extend_from_slice(&[0u8; 10]);
    fs::write(&file, &bytes).unwrap();

    let mut doc = Fpff::new();
    assert_eq!(doc.read(&file).unwrap(), 10);
    assert_eq!(doc.container(), &mixed_container_with_timestamp(doc.container().timestamp));

    let strict = FpffOptions { trailing: fpff::TrailingBytes::Reject, ..FpffOptions::default() };
    let mut doc = Fpff::with_options(strict);
    assert!(matches!(doc.read(&file), Err(Error::Decode(DecodeError::TrailingData(10)))));
}

fn mixed_container_with_timestamp(ts: u32) -> Container {
    let mut c = mixed_container();
    c.timestamp = ts;
    c
}

#[test]
fn test_failed_write_leaves_no_file() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("missing_dir").join("out.fpff");

    assert!(Fpff::from(mixed_container()).write(&file).is_err());
    assert!(!file.exists());
}

#[test]
fn test_write_replaces_existing_file() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("doc.fpff");

    Fpff::from(mixed_container()).write(&file).unwrap();
    Fpff::new().write(&file).unwrap();

    assert!(Fpff::open(&file).unwrap().is_empty());
    assert_eq!(dir_listing(tmp.path()), vec!["doc.fpff"]);
}

#[cfg(unix)]
#[test]
fn test_write_keeps_file_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("doc.fpff");
    let plain = tmp.path().join("plain");

    // A fresh file gets the same mode an ordinary create would.
    Fpff::from(mixed_container()).write(&file).unwrap();
    fs::File::create(&plain).unwrap();
    let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(&file), mode(&plain));

    // Rewriting keeps whatever mode the file already had.
    fs::set_permissions(&file, fs::Permissions::from_mode(0o640)).unwrap();
    Fpff::new().write(&file).unwrap();
    assert_eq!(mode(&file), 0o640);
    assert!(Fpff::open(&file).unwrap().is_empty());
}

// ── Round-trip property ──────────────────────────────────────────────────────

fn arb_section() -> impl Strategy<Value = Section> {
    let ascii = "[ -~]{0,64}".prop_map(|s| Section::new(SectionType::Ascii, s.into_bytes()));
    let utf8 = any::<String>().prop_map(|s| Section::new(SectionType::Utf8, s.into_bytes()));
    let words = prop::collection::vec(any::<[u8; 4]>(), 1..16)
        .prop_map(|w| Section::new(SectionType::Words, w.concat()));
    let doubles = prop::collection::vec(any::<f64>(), 1..8).prop_map(|v| {
        let bytes: Vec<u8> = v.iter().flat_map(|d| d.to_le_bytes()).collect();
        Section::new(SectionType::Doubles, bytes)
    });
    let coord = any::<[u8; 16]>().prop_map(|b| Section::new(SectionType::Coord, b.to_vec()));
    let media = (
        prop::sample::select(vec![SectionType::Png, SectionType::Gif87, SectionType::Gif89]),
        prop::collection::vec(any::<u8>(), 1..256),
    )
        .prop_map(|(ty, data)| Section::new(ty, data));

    prop_oneof![ascii, utf8, words, doubles, coord, media].prop_map(|r| r.unwrap())
}

proptest! {
    #[test]
    fn prop_decode_inverts_encode(
        sections in prop::collection::vec(arb_section(), 0..12),
        author in "[a-z]{0,8}",
        timestamp in any::<u32>(),
    ) {
        let mut c = Container::with_author(&author).unwrap();
        c.timestamp = timestamp;
        for s in sections {
            c.append(s);
        }
        let bytes = codec::encode_to_vec(&c).unwrap();
        prop_assert_eq!(bytes.len() as u64, codec::encoded_len(&c));
        prop_assert_eq!(codec::decode_slice(&bytes).unwrap(), c);
    }
}
