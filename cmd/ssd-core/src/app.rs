use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::layout::SsdLayout;
use crate::output::ResultRegister;
use crate::ssd::Ssd;
use crate::SsdCore;

pub fn layout_from(data_dir: &std::path::Path, lock_timeout_secs: u64) -> SsdLayout {
    SsdLayout::new(data_dir).with_lock_timeout(Duration::from_secs(lock_timeout_secs))
}

/// One command, one result line on stdout.
pub fn run(layout: SsdLayout, tokens: &[String]) -> anyhow::Result<ResultRegister> {
    let mut ssd = Ssd::open(layout).context("Failed to open device")?;
    let register = ssd.run(tokens).context("Command failed")?;
    println!("{register}");
    Ok(register)
}

pub async fn serve(layout: SsdLayout) -> anyhow::Result<()> {
    tracing::info!("Serving device in {}", layout.root().display());
    let core = SsdCore::new(Ssd::open(layout).context("Failed to open device")?);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" {
            break;
        }
        match core.execute_line(line).await {
            Ok(register) => println!("{register}"),
            Err(e) => {
                tracing::error!("{}: {}", line, e);
                println!("{}", ResultRegister::Error);
            }
        }
    }
    Ok(())
}

pub fn format(layout: SsdLayout) -> anyhow::Result<()> {
    tracing::info!("Formatting device in {}", layout.root().display());
    let mut ssd = Ssd::open(layout).context("Failed to open device")?;
    ssd.format().context("Format failed")?;
    tracing::info!("Format complete.");
    Ok(())
}

pub fn debug(layout: SsdLayout) -> anyhow::Result<()> {
    let mut ssd = Ssd::open(layout).context("Failed to open device")?;
    let (slots, array) = ssd.inspect().context("Failed to read device state")?;

    for slot in &slots {
        println!("{slot}");
    }
    for (lba, word) in array.iter().filter(|(_, word)| !word.is_zero()) {
        println!("{lba}\t{word}");
    }
    Ok(())
}
