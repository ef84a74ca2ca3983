//! `wgr audit ...` handlers.

use anyhow::{bail, Result};
use wgr_audit::{find_uncommitted_intents, verify_hash_chain, VerifyResult};

pub fn verify(path: &str) -> Result<()> {
    match verify_hash_chain(path)? {
        VerifyResult::Valid { lines } => {
            println!("valid=true lines={}", lines);
            Ok(())
        }
        VerifyResult::Broken { line, reason } => {
            println!("valid=false line={} reason={}", line, reason);
            bail!("journal hash chain broken at line {}", line)
        }
    }
}

pub fn uncommitted(path: &str) -> Result<()> {
    let intents = find_uncommitted_intents(path)?;
    println!("uncommitted={}", intents.len());
    for ev in &intents {
        println!(
            "op_id={} event_type={} ts_utc={}",
            ev.op_id,
            ev.event_type,
            ev.ts_utc.to_rfc3339()
        );
    }
    Ok(())
}
