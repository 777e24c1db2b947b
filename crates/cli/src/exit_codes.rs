//! CLI Exit Code Registry
//!
//! Single source of truth for `ledgercheck` exit codes. Scripts and CI
//! jobs branch on these, so treat them as part of the shell contract.
//!
//! | Code | Meaning                                                      |
//! |------|--------------------------------------------------------------|
//! | 0    | Success, nothing to review                                   |
//! | 2    | Usage error (bad arguments, refusing to overwrite a file)    |
//! | 3    | Invalid configuration (parse, validation, unresolved column) |
//! | 4    | Runtime error (unreadable file, bad CSV, internal invariant)  |
//! | 5    | Run completed with findings                                  |

use ledgercheck_recon::ReconError;

/// Success - command completed, nothing to review.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments or an unsafe request.
pub const EXIT_USAGE: u8 = 2;

/// Config could not be parsed or validated, or a mandatory column is missing.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 3;

/// Input could not be read or processed.
pub const EXIT_RECON_RUNTIME: u8 = 4;

/// Differing or one-sided accounts, voucher gaps, or unbalanced vouchers.
pub const EXIT_RECON_FINDINGS: u8 = 5;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_)
        | ReconError::ConfigValidation(_)
        | ReconError::Configuration { .. } => EXIT_RECON_INVALID_CONFIG,
        ReconError::Csv(_) | ReconError::Invariant(_) | ReconError::Json(_) => {
            EXIT_RECON_RUNTIME
        }
    }
}
