//! Tracing filter construction

/// Build filter directives string from LoggingConfig
///
/// Produces the base level followed by one `megabase::<component>=<level>`
/// directive per configured component.
///
/// # Examples
///
/// ```
/// use megabase::config::{LogFormat, LoggingConfig};
/// use megabase::logging::build_filter_directives;
/// use std::collections::HashMap;
///
/// let mut component_levels = HashMap::new();
/// component_levels.insert("cache".to_string(), "debug".to_string());
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Pretty,
///     component_levels: Some(component_levels),
///     ansi: false,
/// };
///
/// assert_eq!(build_filter_directives(&config), "info,megabase::cache=debug");
/// ```
pub fn build_filter_directives(config: &crate::config::LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        // Sorted so the directive string is stable across runs
        let mut components: Vec<_> = component_levels.iter().collect();
        components.sort();
        for (component, level) in components {
            filter_str.push_str(&format!(",megabase::{}={}", component, level));
        }
    }

    filter_str
}
