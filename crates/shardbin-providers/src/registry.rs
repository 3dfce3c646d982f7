//! Name-based provider construction

use crate::{clbin, dummy, pastecnetorg, pipfi, termbin};
use crate::{Options, Provider, ProviderError, CLBIN, DUMMY, PASTECNETORG, PIPFI, TERMBIN};

/// Build a provider by name. Unknown names fail with
/// [`ProviderError::UnknownProvider`].
pub fn build(name: &str, options: &Options) -> Result<Box<dyn Provider>, ProviderError> {
    match name {
        TERMBIN => Ok(Box::new(termbin::Termbin::new()?)),
        CLBIN => Ok(Box::new(clbin::Clbin::new()?)),
        PIPFI => Ok(Box::new(pipfi::Pipfi::new()?)),
        PASTECNETORG => Ok(Box::new(pastecnetorg::Pastecnetorg::new()?)),
        DUMMY => Ok(Box::new(dummy::Dummy::new(options))),
        other => Err(ProviderError::UnknownProvider(other.to_string())),
    }
}
