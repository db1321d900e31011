use std::io::{self, Write};

use anyhow::Result;

/// Read one trimmed line, showing `default` in brackets and returning it on
/// empty input.
pub fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(d) if !d.is_empty() => print!("{} [{}]: ", label, d),
        _ => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match default {
        Some(d) if input.is_empty() => d.to_string(),
        _ => input.to_string(),
    })
}

pub fn prompt_password(label: &str) -> Result<String> {
    let password = rpassword::prompt_password(format!("{}: ", label))?;
    Ok(password)
}

/// Environment value if set and non-empty
pub fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
