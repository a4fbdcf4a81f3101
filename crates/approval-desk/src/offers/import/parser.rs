use std::io::Read;

use super::headers::normalize_header;
use super::RawImportRow;

/// Reads every data row of a CSV export. Only an unreadable header line fails the whole call;
/// a row that cannot be read is returned as [`RawImportRow::Malformed`] and rows whose cells
/// are all blank are skipped. Rows are numbered from 1, excluding the header.
pub fn parse_rows<R: Read>(reader: R) -> Result<Vec<RawImportRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(normalize_header)
        .collect();
    let mut rows = Vec::new();

    for (offset, record) in csv_reader.records().enumerate() {
        let row = offset + 1;
        match record {
            Ok(record) => {
                if record.iter().all(|cell| cell.is_empty()) {
                    continue;
                }
                let columns = headers
                    .iter()
                    .cloned()
                    .zip(record.iter().map(str::to_string))
                    .collect();
                rows.push(RawImportRow::Columns { row, columns });
            }
            Err(err) => rows.push(RawImportRow::Malformed {
                row,
                error: err.to_string(),
            }),
        }
    }

    Ok(rows)
}
