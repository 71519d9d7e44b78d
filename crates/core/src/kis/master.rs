//! KIS stock master files: zipped fixed-width EUC-KR listings of every code per market. Used to
//! keep `krx_listed_companies` current.

use crate::domain::company::Company;
use anyhow::{Context, Result};
use encoding_rs::EUC_KR;

const KOSPI_MASTER_ZIP: &str =
    "https://new.real.download.dws.co.kr/common/master/kospi_code.mst.zip";
const KOSDAQ_MASTER_ZIP: &str =
    "https://new.real.download.dws.co.kr/common/master/kosdaq_code.mst.zip";
const KONEX_MASTER_ZIP: &str =
    "https://new.real.download.dws.co.kr/common/master/konex_code.mst.zip";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KisMarket {
    Kospi,
    Kosdaq,
    Konex,
}

impl KisMarket {
    pub fn master_zip_url(self) -> &'static str {
        match self {
            KisMarket::Kospi => KOSPI_MASTER_ZIP,
            KisMarket::Kosdaq => KOSDAQ_MASTER_ZIP,
            KisMarket::Konex => KONEX_MASTER_ZIP,
        }
    }
}

/// Comma-separated market list; unknown names are ignored, and an empty result falls back to
/// KOSPI + KOSDAQ.
pub fn parse_markets(v: Option<&str>) -> Vec<KisMarket> {
    let mut out = Vec::new();
    for part in v.unwrap_or_default().split(',') {
        let market = match part.trim().to_ascii_uppercase().as_str() {
            "KOSPI" => KisMarket::Kospi,
            "KOSDAQ" => KisMarket::Kosdaq,
            "KONEX" => KisMarket::Konex,
            _ => continue,
        };
        if !out.contains(&market) {
            out.push(market);
        }
    }
    if out.is_empty() {
        out.push(KisMarket::Kospi);
        out.push(KisMarket::Kosdaq);
    }
    out
}

pub async fn fetch_master_companies(
    http: &reqwest::Client,
    market: KisMarket,
) -> Result<Vec<Company>> {
    let url = market.master_zip_url();
    let res = http
        .get(url)
        .send()
        .await
        .context("master zip download failed")?;
    let status = res.status();
    let bytes = res.bytes().await.context("read master zip bytes failed")?;
    if !status.is_success() {
        anyhow::bail!("master zip HTTP {status} ({url})");
    }

    let bytes_vec = bytes.to_vec();
    tokio::task::spawn_blocking(move || unzip_and_parse_master(&bytes_vec))
        .await
        .context("join unzip task failed")?
}

fn unzip_and_parse_master(zip_bytes: &[u8]) -> Result<Vec<Company>> {
    use std::io::{Cursor, Read};

    let mut zip = zip::ZipArchive::new(Cursor::new(zip_bytes)).context("open zip archive failed")?;
    anyhow::ensure!(zip.len() >= 1, "zip has no entries");

    let mut mst_idx = 0;
    for i in 0..zip.len() {
        let f = zip.by_index(i).context("open zip entry failed")?;
        if f.name().to_ascii_lowercase().ends_with(".mst") {
            mst_idx = i;
            break;
        }
    }

    let mut file = zip.by_index(mst_idx).context("open zip entry failed")?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).context("read zip entry failed")?;

    Ok(parse_master_lines(&buf))
}

fn parse_master_lines(buf: &[u8]) -> Vec<Company> {
    let mut out = Vec::new();
    for line in buf.split(|b| *b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if let Some(company) = parse_master_line(line) {
            out.push(company);
        }
    }
    out
}

// Layout: 6-digit short code, padding, 12-byte ISIN, EUC-KR name, then the group-code block
// starting with " ST".
fn parse_master_line(line: &[u8]) -> Option<Company> {
    let code_bytes = line.get(0..6)?;
    if !code_bytes.iter().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let code = std::str::from_utf8(code_bytes).ok()?.to_string();

    let mut i = 6;
    while i < line.len() && line[i].is_ascii_whitespace() {
        i += 1;
    }

    let name_start = if line.len() >= i + 12 {
        i + 12
    } else {
        while i < line.len() && !line[i].is_ascii_whitespace() {
            i += 1;
        }
        i
    };
    if name_start >= line.len() {
        return None;
    }

    let after_isin = &line[name_start..];
    let st_pos = find_st_marker(after_isin).unwrap_or(after_isin.len());
    let name = decode_euc_kr_trim(&after_isin[..st_pos]);
    if name.is_empty() {
        return None;
    }

    Some(Company { name, code })
}

fn find_st_marker(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(2)
        .enumerate()
        .find(|&(i, w)| w == b"ST" && (i == 0 || bytes[i - 1].is_ascii_whitespace()))
        .map(|(i, _)| i)
}

fn decode_euc_kr_trim(bytes: &[u8]) -> String {
    let is_pad = |b: &u8| b.is_ascii_whitespace() || *b == 0;
    let start = bytes.iter().position(|b| !is_pad(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !is_pad(b)).map_or(start, |p| p + 1);

    let (cow, _, _) = EUC_KR.decode(&bytes[start..end]);
    cow.trim().to_string()
}
