// ==========================================
// LYRIQ 车源价格追踪 - 文件解析器实现
// ==========================================
// 职责: CSV 读取、分隔符嗅探、表头规范化、必需列校验
// 支持: 任意扩展名的分隔文本（, ; TAB | :），默认 UTF-8（可带 BOM），可指定其他编码
// ==========================================

use crate::domain::listing::RawRow;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_extractor::canonical_column_name;
use crate::importer::listing_importer_trait::FileParser;
use csv::ReaderBuilder;
use encoding_rs::{Encoding, UTF_8};
use std::path::Path;

/// 嗅探样本长度（字节）
pub const SNIFF_SAMPLE_BYTES: usize = 1024;

/// 候选分隔符（按优先级排列，平分时靠前者胜出）
pub const CANDIDATE_DELIMITERS: [u8; 5] = [b',', b';', b'\t', b'|', b':'];

/// 默认输入编码
pub const DEFAULT_ENCODING: &str = "utf-8";

const UTF8_BOM: char = '\u{feff}';

// ==========================================
// ParsedFile - 解析结果
// ==========================================
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub delimiter: u8,
    pub headers: Vec<String>, // 规范化后的列名（保持文件顺序）
    pub rows: Vec<RawRow>,
}

impl ParsedFile {
    pub fn delimiter_label(&self) -> String {
        match self.delimiter {
            b'\t' => "\\t".to_string(),
            other => (other as char).to_string(),
        }
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser {
    encoding: String, // WHATWG 编码标签
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new(DEFAULT_ENCODING)
    }
}

impl FileParser for CsvParser {
    fn parse(&self, file_path: &Path, required_columns: &[String]) -> ImportResult<ParsedFile> {
        // 检查文件存在
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        let bytes = std::fs::read(file_path)?;
        let content = self.decode(&bytes).map_err(|err| match err {
            ImportError::FileReadError(message) => {
                ImportError::FileReadError(format!("{}: {}", file_path.display(), message))
            }
            other => other,
        })?;

        self.parse_str(&content, required_columns)
            .map_err(|err| match err {
                ImportError::EmptyHeader(_) => {
                    ImportError::EmptyHeader(file_path.display().to_string())
                }
                other => other,
            })
    }
}

impl CsvParser {
    pub fn new(encoding: impl Into<String>) -> Self {
        Self {
            encoding: encoding.into(),
        }
    }

    /// 按配置的编码解码文件内容
    ///
    /// UTF-8 严格校验；其他编码出现无法映射的字节时报错
    pub fn decode(&self, bytes: &[u8]) -> ImportResult<String> {
        let encoding = Encoding::for_label(self.encoding.trim().as_bytes()).ok_or_else(|| {
            ImportError::ConfigValueError {
                key: "encoding".to_string(),
                value: self.encoding.clone(),
                message: "不支持的字符编码".to_string(),
            }
        })?;

        if encoding == UTF_8 {
            return String::from_utf8(bytes.to_vec())
                .map_err(|e| ImportError::FileReadError(format!("非 UTF-8 编码 ({})", e)));
        }

        let (text, actual, had_errors) = encoding.decode(bytes);
        if had_errors {
            return Err(ImportError::FileReadError(format!(
                "内容无法按 {} 解码",
                actual.name()
            )));
        }
        tracing::debug!(encoding = actual.name(), bytes = bytes.len(), "输入已转码");
        Ok(text.into_owned())
    }

    /// 解析内存中的 CSV 文本
    pub fn parse_str(&self, content: &str, required_columns: &[String]) -> ImportResult<ParsedFile> {
        let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
        let delimiter = sniff_delimiter(sample_prefix(content, SNIFF_SAMPLE_BYTES));

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true) // 允许行长度不一致
            .from_reader(content.as_bytes());

        // 读取表头
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(canonical_column_name)
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::EmptyHeader("<memory>".to_string()));
        }

        check_required_columns(&headers, required_columns)?;

        // 读取所有行（空白行保留，由规范化阶段计数后丢弃）
        let mut rows = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            let mut row = RawRow::new(row_idx + 1);

            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    if !header.is_empty() {
                        row.insert(header.clone(), value.trim());
                    }
                }
            }

            rows.push(row);
        }

        tracing::debug!(
            delimiter = %(delimiter as char).escape_default(),
            columns = headers.len(),
            rows = rows.len(),
            "CSV 解析完成"
        );

        Ok(ParsedFile {
            delimiter,
            headers,
            rows,
        })
    }
}

fn check_required_columns(headers: &[String], required_columns: &[String]) -> ImportResult<()> {
    for required in required_columns {
        let column = canonical_column_name(required);
        if column.is_empty() {
            continue;
        }
        if !headers.iter().any(|h| *h == column) {
            return Err(ImportError::MissingColumn {
                column,
                available: headers.join(", "),
            });
        }
    }
    Ok(())
}

/// 截取前 max_bytes 字节（对齐到字符边界）
fn sample_prefix(content: &str, max_bytes: usize) -> &str {
    if content.len() <= max_bytes {
        return content;
    }
    let mut end = max_bytes;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

// ==========================================
// 分隔符嗅探
// ==========================================
// 评分: (与表头字段数一致的行数, 表头字段数)，取最大者
// 表头只有一个字段的候选不参与；全部落空时默认逗号
pub fn sniff_delimiter(sample: &str) -> u8 {
    let mut lines: Vec<&str> = sample.split('\n').collect();

    // 样本被截断时最后一行可能不完整
    if lines.len() > 1 && !sample.ends_with('\n') {
        lines.pop();
    }

    let lines: Vec<&str> = lines
        .into_iter()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .collect();

    let Some(header_line) = lines.first() else {
        return b',';
    };

    let mut best: Option<(u8, (usize, usize))> = None;
    for delimiter in CANDIDATE_DELIMITERS {
        let header_fields = count_fields(header_line, delimiter);
        if header_fields < 2 {
            continue;
        }

        let consistent = lines
            .iter()
            .filter(|line| count_fields(line, delimiter) == header_fields)
            .count();
        let score = (consistent, header_fields);

        match best {
            Some((_, best_score)) if best_score >= score => {}
            _ => best = Some((delimiter, score)),
        }
    }

    best.map(|(delimiter, _)| delimiter).unwrap_or(b',')
}

/// 统计一行的字段数（引号内的分隔符不计）
fn count_fields(line: &str, delimiter: u8) -> usize {
    let delimiter = delimiter as char;
    let mut in_quotes = false;
    let mut fields = 1;

    for c in line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == delimiter && !in_quotes {
            fields += 1;
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn required_vin() -> Vec<String> {
        vec!["vin".to_string()]
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "VIN,Stock,Price,Interior Color").unwrap();
        writeln!(temp_file, "1GYKPMRL0RZ100001,C1001,\"$37,900.00\",Black").unwrap();
        writeln!(temp_file, "1GYKPMRL0RZ100002,C1002,\"$44,468.00\", Sky Cool Gray ").unwrap();

        let parsed = CsvParser::default().parse(temp_file.path(), &required_vin()).unwrap();

        assert_eq!(parsed.delimiter, b',');
        assert_eq!(parsed.headers, vec!["vin", "stock", "price", "interior_color"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].row_number, 1);
        assert_eq!(parsed.rows[0].get("price"), Some("$37,900.00"));
        assert_eq!(parsed.rows[1].get("interior_color"), Some("Sky Cool Gray"));
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser::default().parse(Path::new("/nonexistent/listings.csv"), &required_vin());
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_missing_required_column() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "Stock,Price").unwrap();
        writeln!(temp_file, "C1001,$37900").unwrap();

        let result = CsvParser::default().parse(temp_file.path(), &required_vin());
        match result {
            Err(ImportError::MissingColumn { column, available }) => {
                assert_eq!(column, "vin");
                assert_eq!(available, "stock, price");
            }
            other => panic!("期望 MissingColumn，实际 {:?}", other.map(|p| p.headers)),
        }
    }

    #[test]
    fn test_csv_parser_bom_and_aliases() {
        let content = "\u{feff}VIN;Milege;Phone\n1GYK0001;\"10,203\";\n";
        let parsed = CsvParser::default().parse_str(content, &required_vin()).unwrap();

        assert_eq!(parsed.delimiter, b';');
        assert_eq!(parsed.headers, vec!["vin", "mileage", "request_info"]);
        assert_eq!(parsed.rows[0].get("mileage"), Some("10,203"));
        assert_eq!(parsed.rows[0].get("request_info"), Some(""));
    }

    #[test]
    fn test_csv_parser_short_rows_and_blank_rows() {
        let content = "vin,stock,price\n1GYK0001,C1\n,,\n1GYK0002,C2,$1\n";
        let parsed = CsvParser::default().parse_str(content, &required_vin()).unwrap();

        assert_eq!(parsed.rows.len(), 3);
        assert_eq!(parsed.rows[0].get("price"), None);
        assert!(parsed.rows[1].is_blank());
        assert_eq!(parsed.rows[2].row_number, 3);
    }

    #[test]
    fn test_csv_parser_empty_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let result = CsvParser::default().parse(temp_file.path(), &required_vin());
        assert!(matches!(result, Err(ImportError::EmptyHeader(_))));
    }

    #[test]
    fn test_csv_parser_latin1_input() {
        // "Montréal, QC" 与 "Crème" 的 Latin-1 字节
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"VIN,Location,Interior Color\n1GYK0001,\"Montr\xe9al, QC\",Cr\xe8me\n")
            .unwrap();

        let parsed = CsvParser::new("latin1")
            .parse(temp_file.path(), &required_vin())
            .unwrap();
        assert_eq!(parsed.rows[0].get("location"), Some("Montréal, QC"));
        assert_eq!(parsed.rows[0].get("interior_color"), Some("Crème"));

        // 同一文件按 UTF-8 读取失败
        let result = CsvParser::default().parse(temp_file.path(), &required_vin());
        assert!(matches!(result, Err(ImportError::FileReadError(_))));
    }

    #[test]
    fn test_csv_parser_unknown_encoding() {
        let result = CsvParser::new("klingon-8").decode(b"vin\n");
        assert!(matches!(result, Err(ImportError::ConfigValueError { .. })));
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3\n"), b',');
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3\n"), b';');
        assert_eq!(sniff_delimiter("a\tb\tc\n1\t2\t3\n"), b'\t');
        assert_eq!(sniff_delimiter("a|b\n1|2\n"), b'|');
        assert_eq!(sniff_delimiter("single\nvalue\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn test_sniff_delimiter_ignores_quoted() {
        // 引号内的逗号不应让逗号胜出
        let sample = "vin;price;location\nA1;\"$37,900.00\";\"Austin, TX\"\nA2;\"$1,000\";\"Reno, NV\"\n";
        assert_eq!(sniff_delimiter(sample), b';');
    }

    #[test]
    fn test_sniff_delimiter_truncated_sample() {
        let sample = "vin,stock\nA1,S1\nA2,S2;partial;line";
        assert_eq!(sniff_delimiter(sample), b',');
    }

    #[test]
    fn test_sample_prefix_char_boundary() {
        let content = "ab\u{00e9}cd";
        assert_eq!(sample_prefix(content, 3), "ab");
        assert_eq!(sample_prefix(content, 100), content);
    }
}
