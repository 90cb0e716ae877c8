/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules.
/// This structure ensures that access control is applied explicitly at the
/// module level (via Axum layers), preventing accidental exposure of
/// protected endpoints.

/// Routes accessible to all users (anonymous, read-only) plus the signup flow.
pub mod public;

/// The authoring area: every route here requires a resolved identity.
/// Protected once, at the router layer, by the `AuthUser` extractor middleware.
pub mod admin;
