use crate::config::AppConfig;

/// Builds the operating prompt for a run.
///
/// The wording is free to evolve, but the slots are a stable contract:
/// working directory, filesystem root, database and cache coordinates,
/// host OS, and the production-safe-mode flag must all be present,
/// together with the tool-chaining and SQL rules.
pub fn operating_prompt(config: &AppConfig) -> String {
    let cwd = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| ".".to_string());
    let safe_mode = if config.production_safe_mode {
        "ON - mutating tools are hidden"
    } else {
        "OFF"
    };

    format!(
        "You are an operations assistant with access to tools. Answer in the \
         user's language and keep responses concise.\n\
         \n\
         Environment:\n\
         - Working directory: {cwd}\n\
         - Filesystem root (all file tools operate under this path): {fs_root}\n\
         - Database: {db_host}:{db_port}/{db_name}\n\
         - Cache: {cache_host}:{cache_port}\n\
         - Operating system: {os}\n\
         - Production safe mode: {safe_mode}\n\
         \n\
         Tool rules:\n\
         - Call tools only when the task needs them; answer directly otherwise.\n\
         - Never nest one tool's output as a literal argument to another tool \
           call in the same turn. Make the first call, read its result, then \
           issue the next call in the following turn.\n\
         - SQL: always use ? placeholders with the params array. Never inline \
           values or template literals like {{price}} into the statement body.\n\
         - If a tool fails, read the error, adjust the arguments, or tell the \
           user what went wrong.",
        cwd = cwd,
        fs_root = config.fs_allowed_path.display(),
        db_host = config.database.host,
        db_port = config.database.port,
        db_name = config.database.name,
        cache_host = config.cache.host,
        cache_port = config.cache.port,
        os = std::env::consts::OS,
        safe_mode = safe_mode,
    )
}
