//! User-facing texts of the sign-in screen.

/// Screen heading.
pub const SCREEN_TITLE: &str = "Firebase + Google Sign-In";

/// Label of the sign-in button.
pub const SIGN_IN_LABEL: &str = "Sign in with Google";

/// Label of the sign-out button.
pub const SIGN_OUT_LABEL: &str = "Sign out";

/// Shown instead of a missing display name.
pub const NO_DISPLAY_NAME: &str = "No display name";

pub const NOT_READY_TITLE: &str = "Please wait";
pub const NOT_READY_MESSAGE: &str =
    "Google sign-in has not finished initializing. Wait a moment and try again.";

pub const SANDBOX_UNSUPPORTED_TITLE: &str = "Not supported in the sandbox client";
pub const SANDBOX_UNSUPPORTED_MESSAGE: &str = "To use Google sign-in in the sandbox client, set \
     expo.extra.googleAuth.expoClientId or use a development build of the app.";

pub const CANCELLED_TITLE: &str = "Sign-in was cancelled";

pub const ERROR_TITLE: &str = "Error";
pub const SIGN_IN_FAILED_MESSAGE: &str =
    "Google sign-in failed. Check your network connection and the client ID configuration.";
pub const SIGN_OUT_FAILED_MESSAGE: &str = "Sign-out failed.";

/// Warning under the disabled sign-in button in an unconfigured sandbox client.
pub const SANDBOX_WARNING: &str = "To test in the sandbox client, set a sandbox client ID in \
     expo.extra.googleAuth.expoClientId in app.json. A development build works as is.";
