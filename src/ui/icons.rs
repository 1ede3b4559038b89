pub struct Icons;

impl Icons {
    pub const BOX: &str = "📦";
    pub const SEARCH: &str = "🔍";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const LINK: &str = "🔗";
    pub const DATABASE: &str = "🗄️";
    pub const CLOCK: &str = "⏱️";
    pub const BROOM: &str = "🧹";
}
