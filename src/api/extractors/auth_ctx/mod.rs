/*!
 * Authentication context extractor
 *
 * Responsibility:
 * - Give handlers the principal the access middleware validated
 * - Handlers never read tokens or headers themselves
 */

mod core;

pub use core::AuthCtx;
