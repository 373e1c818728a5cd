//! Stealth evasion JavaScript registered for every new document.
//! Based on puppeteer-extra-plugin-stealth techniques.

pub const STEALTH_SCRIPTS: &[&str] = &[
    // Remove webdriver property
    r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
    "#,
    // Fix chrome object
    r#"
    if (!window.chrome) {
        window.chrome = { runtime: {}, loadTimes: function() {}, csi: function() {}, app: {} };
    }
    "#,
    // Fix permissions
    r#"
    if (navigator.permissions && navigator.permissions.query) {
        const originalQuery = navigator.permissions.query.bind(navigator.permissions);
        navigator.permissions.query = (parameters) => (
            parameters.name === 'notifications'
                ? Promise.resolve({ state: Notification.permission })
                : originalQuery(parameters)
        );
    }
    "#,
    // Map sites localize by language; match the default site
    r#"
    Object.defineProperty(navigator, 'languages', {
        get: () => ['ru-RU', 'ru', 'en-US', 'en'],
        configurable: true
    });
    "#,
    // Remove chromedriver leftovers
    r#"
    for (const key of Object.keys(window)) {
        if (key.startsWith('cdc_')) {
            delete window[key];
        }
    }
    "#,
];

/// All scripts as one document-start payload. Each script runs in its own
/// `try` block so one failing patch does not skip the rest.
pub fn combined() -> String {
    STEALTH_SCRIPTS
        .iter()
        .map(|script| format!("try {{ {} }} catch (e) {{}}", script.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}
