use wrc_identities::{check, log, summarize, theory::conclusions, CheckConfig, Error, Theory};

/// Checks both identities without K, as the anti-symmetric theory stands,
/// and again with K added.
#[snafu::report]
fn main() -> Result<(), Error> {
    log::init();
    let theory = Theory::anti_symmetric_weak_relative_closure()?;
    let theories = [theory.clone(), theory.with_k()?];
    let conclusions = conclusions()?;
    let config = CheckConfig::default();
    let mut out = std::io::stdout().lock();
    for theory in &theories {
        let results = check(theory, &conclusions, &config, &mut out)?;
        summarize(theory, &results, &mut out)?;
    }
    Ok(())
}
