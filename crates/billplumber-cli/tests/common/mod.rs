#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::Path;

use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};
use zip::AesMode;
use zip::write::{SimpleFileOptions, ZipWriter};

fn gbk_hex(text: &str) -> String {
    let (bytes, _, _) = encoding_rs::GBK.encode(text);
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// A one-page statement with a header row and the given data rows
/// (time, direction, amount, counterparty).
pub fn statement_document(rows: &[[&str; 4]]) -> Document {
    const XS: [f64; 5] = [40.0, 190.0, 290.0, 390.0, 470.0];
    let header = ["交易时间", "收/支", "金额(元)", "交易对方"];
    let all: Vec<[&str; 4]> = std::iter::once(header).chain(rows.iter().copied()).collect();

    let top = 780.0;
    let bottom = top - 20.0 * all.len() as f64;
    let mut ops = String::from("1 w\n");
    for i in 0..=all.len() {
        let y = top - 20.0 * i as f64;
        ops.push_str(&format!("{} {y} m {} {y} l S\n", XS[0], XS[4]));
    }
    for x in XS {
        ops.push_str(&format!("{x} {top} m {x} {bottom} l S\n"));
    }
    for (i, cells) in all.iter().enumerate() {
        let baseline = top - 20.0 * (i + 1) as f64 + 6.0;
        for (col, text) in cells.iter().enumerate() {
            ops.push_str(&format!(
                "BT /F1 10 Tf {} {baseline} Td <{}> Tj ET\n",
                XS[col] + 4.0,
                gbk_hex(text)
            ));
        }
    }

    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => "SimSun",
        "Encoding" => "GBK-EUC-H",
    });
    let content_id = doc.add_object(Stream::new(dictionary! {}, ops.into_bytes()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        "Contents" => content_id,
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn save(mut doc: Document) -> Vec<u8> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to save test PDF");
    buf
}

pub fn statement_pdf(rows: &[[&str; 4]]) -> Vec<u8> {
    save(statement_document(rows))
}

pub fn encrypted_statement_pdf(rows: &[[&str; 4]], user_password: &str) -> Vec<u8> {
    let mut doc = statement_document(rows);
    doc.trailer.set(
        "ID",
        vec![
            Object::String(vec![1u8; 16], StringFormat::Literal),
            Object::String(vec![2u8; 16], StringFormat::Literal),
        ],
    );
    let version = lopdf::EncryptionVersion::V2 {
        document: &doc,
        owner_password: "owner",
        user_password,
        key_length: 128,
        permissions: lopdf::Permissions::all(),
    };
    let state = lopdf::EncryptionState::try_from(version).expect("encryption state");
    doc.encrypt(&state).expect("encrypt test PDF");
    save(doc)
}

/// Write a zip at `path`, AES-256 encrypted when `password` is given.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])], password: Option<&str>) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    for (name, data) in entries {
        let options = SimpleFileOptions::default();
        let options = match password {
            Some(pw) => options.with_aes_encryption(AesMode::Aes256, pw),
            None => options,
        };
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
}

pub const JANUARY: [[&str; 4]; 2] = [
    ["2024-01-02 08:00:00", "支出", "￥12.50", "早餐店"],
    ["2024-01-05 19:30:00", "收入", "￥200.00", "朋友"],
];

pub const FEBRUARY: [[&str; 4]; 1] = [["2024-02-01 09:15:00", "支出", "￥8.00", "早餐店"]];
