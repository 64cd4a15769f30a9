use std::io::{self, Write};

use crate::error::AppResult;

pub fn print_block(block: &str) -> AppResult<()> {
    let mut stdout = io::stdout().lock();
    for line in block.lines() {
        writeln!(stdout, "{}", line.trim_end())?;
    }
    Ok(())
}
