#![allow(dead_code)]

use polars::prelude::*;
use rust_xlsxwriter::Workbook;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The two-client sample used throughout the tests.
pub const SAMPLE_IDS: [&str; 2] = ["C001", "C002"];

/// Write the sample clients as CSV with the given headers (id, name, phone).
pub fn write_sample_csv(dir: &Path, name: &str, headers: [&str; 3]) -> PathBuf {
    let mut df = df!(
        headers[0] => &["C001", "C002"],
        headers[1] => &["Alice Wu", "Bob Lin"],
        headers[2] => &["0911111111", "0922222222"]
    )
    .unwrap();
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .unwrap();
    path
}

/// Write a CSV of `n` generated clients with Chinese headers.
pub fn write_generated_csv(dir: &Path, n: usize) -> PathBuf {
    let mut df = df!(
        "客戶編號" => (1..=n).map(|i| format!("C{:04}", i)).collect::<Vec<String>>(),
        "姓名" => (1..=n).map(|i| format!("Client {}", i)).collect::<Vec<String>>(),
        "地址" => (1..=n)
            .map(|i| if i % 2 == 0 { "Taipei" } else { "Kaohsiung" }.to_string())
            .collect::<Vec<String>>(),
        "備註" => (1..=n)
            .map(|i| if i % 3 == 0 { "vip" } else { "" }.to_string())
            .collect::<Vec<String>>()
    )
    .unwrap();
    let path = dir.join("generated.csv");
    let mut file = File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(&mut df).unwrap();
    path
}

/// Write the sample clients to an .xlsx workbook. Phone numbers are numbers
/// in the second row to exercise typed cells.
pub fn write_sample_xlsx(dir: &Path, name: &str, sheet: &str) -> PathBuf {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet).unwrap();

    for (col, header) in ["客戶編號", "姓名", "電話", "手機"].iter().enumerate() {
        worksheet.write_string(0, col as u16, *header).unwrap();
    }
    worksheet.write_string(1, 0, "C001").unwrap();
    worksheet.write_string(1, 1, "Alice Wu").unwrap();
    worksheet.write_string(1, 2, "0911111111").unwrap();
    worksheet.write_string(1, 3, "0933000111").unwrap();
    worksheet.write_string(2, 0, "C002").unwrap();
    worksheet.write_string(2, 1, "Bob Lin").unwrap();
    worksheet.write_number(2, 2, 22222222.0).unwrap();

    let path = dir.join(name);
    workbook.save(&path).unwrap();
    path
}
