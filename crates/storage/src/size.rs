//! Human-readable byte-size strings: `N`, `NKB`, `NMB`, `NGB`, decimal
//! fractions permitted.

use supd_core::SupdError;

const SIZE_K: f64 = 1024.0;
const SIZE_M: f64 = SIZE_K * 1024.0;
const SIZE_G: f64 = SIZE_M * 1024.0;

pub fn parse_size(raw: &str) -> Result<u64, SupdError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    if trimmed.len() < 2 {
        return trimmed
            .parse::<u64>()
            .map_err(|e| SupdError::BadArguments(format!("invalid size {raw:?}: {e}")));
    }
    let (head, tail) = trimmed.split_at(trimmed.len() - 2);
    let scale = match tail.to_ascii_uppercase().as_str() {
        "KB" => SIZE_K,
        "MB" => SIZE_M,
        "GB" => SIZE_G,
        _ => {
            return trimmed
                .parse::<u64>()
                .map_err(|e| SupdError::BadArguments(format!("invalid size {raw:?}: {e}")))
        }
    };
    let value: f64 = head
        .parse()
        .map_err(|e| SupdError::BadArguments(format!("invalid size {raw:?}: {e}")))?;
    Ok((value * scale) as u64)
}

pub fn format_size(size: u64) -> String {
    let size = size as f64;
    if size < SIZE_K {
        format!("{}", size as u64)
    } else if size < SIZE_M {
        format!("{:.2}KB", size / SIZE_K)
    } else if size < SIZE_G {
        format!("{:.2}MB", size / SIZE_M)
    } else {
        format!("{:.2}GB", size / SIZE_G)
    }
}

#[cfg(test)]
#[path = "size_tests.rs"]
mod tests;
