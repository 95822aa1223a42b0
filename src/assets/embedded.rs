use rust_embed::RustEmbed;

/// Conversation flows shipped with the binary.
#[derive(RustEmbed)]
#[folder = "flows/"]
pub struct BuiltinFlows;
