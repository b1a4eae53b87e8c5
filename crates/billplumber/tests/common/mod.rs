//! Builders for synthetic bill statement PDFs.
//!
//! Each page draws one ruled table whose cells carry GBK-encoded text shown
//! through a `GBK-EUC-H` Type0 font, the way Chinese statements usually do.

#![allow(dead_code)]

use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};

pub const HEADER: [&str; 4] = ["交易时间", "收/支", "金额(元)", "交易对方"];

/// Column boundaries in points.
const COLUMN_X: [f64; 5] = [40.0, 190.0, 290.0, 390.0, 470.0];
const TABLE_TOP: f64 = 780.0;
const ROW_HEIGHT: f64 = 20.0;

/// One page worth of table rows.
pub type PageRows = Vec<Vec<String>>;

pub fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

pub fn header_row() -> Vec<String> {
    row(&HEADER)
}

fn gbk_hex(text: &str) -> String {
    let (bytes, _, _) = encoding_rs::GBK.encode(text);
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// Content stream drawing `rows` as a ruled grid with text.
fn table_content(rows: &[Vec<String>]) -> Vec<u8> {
    let mut ops = String::from("1 w\n");
    let bottom = TABLE_TOP - ROW_HEIGHT * rows.len() as f64;

    for i in 0..=rows.len() {
        let y = TABLE_TOP - ROW_HEIGHT * i as f64;
        ops.push_str(&format!(
            "{} {y} m {} {y} l S\n",
            COLUMN_X[0],
            COLUMN_X[COLUMN_X.len() - 1]
        ));
    }
    for x in COLUMN_X {
        ops.push_str(&format!("{x} {TABLE_TOP} m {x} {bottom} l S\n"));
    }

    for (i, cells) in rows.iter().enumerate() {
        let baseline = TABLE_TOP - ROW_HEIGHT * (i + 1) as f64 + 6.0;
        for (col, text) in cells.iter().enumerate().take(COLUMN_X.len() - 1) {
            if text.is_empty() {
                continue;
            }
            ops.push_str(&format!(
                "BT /F1 10 Tf {} {baseline} Td <{}> Tj ET\n",
                COLUMN_X[col] + 4.0,
                gbk_hex(text)
            ));
        }
    }
    ops.into_bytes()
}

/// Build a statement document, one table per page.
///
/// With `media_box` false no page (nor the page tree) carries a MediaBox.
pub fn statement_document(pages: &[PageRows], media_box: bool) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => "SimSun",
        "Encoding" => "GBK-EUC-H",
    });

    let mut kids: Vec<Object> = Vec::new();
    for rows in pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, table_content(rows)));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        kids.push(page_id.into());
    }

    let mut pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages.len() as i64,
    };
    if media_box {
        pages_dict.set(
            "MediaBox",
            vec![0.into(), 0.into(), 595.into(), 842.into()],
        );
    }
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

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

pub fn statement_pdf(pages: &[PageRows]) -> Vec<u8> {
    save(statement_document(pages, true))
}

/// The same statement, encrypted with `user_password`.
pub fn encrypted_statement_pdf(pages: &[PageRows], user_password: &str) -> Vec<u8> {
    let mut doc = statement_document(pages, true);
    doc.trailer.set(
        "ID",
        vec![
            Object::String(vec![3u8; 16], StringFormat::Literal),
            Object::String(vec![5u8; 16], StringFormat::Literal),
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

/// A two-page January statement: header plus two rows, then one more row.
pub fn january() -> Vec<PageRows> {
    vec![
        vec![
            header_row(),
            row(&["2024-01-02 08:00:00", "支出", "￥12.50", "早餐店"]),
            row(&["2024-01-05 19:30:00", "收入", "￥200.00", "朋友"]),
        ],
        vec![row(&["2024-01-03 12:00:00", "支出", "￥30.00", "超市"])],
    ]
}

/// A one-page February statement.
pub fn february() -> Vec<PageRows> {
    vec![vec![
        header_row(),
        row(&["2024-02-01 09:15:00", "支出", "￥8.00", "早餐店"]),
    ]]
}
