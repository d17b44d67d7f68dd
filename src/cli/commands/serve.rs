//! Web server command.

use console::style;

use crate::config::{Settings, DEFAULT_BIND};

/// Start the web server.
pub async fn cmd_serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let addr = parse_bind_address(bind)?;

    println!("{} Preparing database...", style("→").cyan());
    let ctx = settings.create_db_context();
    match ctx.init_schema().await {
        Ok(()) => {
            println!("  {} Database ready", style("✓").green());
        }
        Err(e) => {
            eprintln!("  {} Schema setup failed: {}", style("✗").red(), e);
            return Err(anyhow::anyhow!("Schema setup failed: {}", e));
        }
    }

    println!(
        "{} Starting mediawatch API at http://{}",
        style("→").cyan(),
        addr
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, &addr).await
}

/// Parse a bind address that can be:
/// - Just a port: "3040" -> 127.0.0.1:3040
/// - Just a host: "0.0.0.0" -> 0.0.0.0:<default port>
/// - Host and port: "0.0.0.0:3040"
fn parse_bind_address(bind: &str) -> anyhow::Result<String> {
    let default_port = DEFAULT_BIND
        .rsplit_once(':')
        .and_then(|(_, p)| p.parse::<u16>().ok())
        .unwrap_or(3040);

    if let Ok(port) = bind.parse::<u16>() {
        return Ok(format!("127.0.0.1:{}", port));
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if port_str.parse::<u16>().is_ok() {
            return Ok(format!("{}:{}", host, port_str));
        }
        anyhow::bail!("Invalid port in bind address '{}'", bind);
    }

    Ok(format!("{}:{}", bind, default_port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_address() {
        assert_eq!(parse_bind_address("8080").unwrap(), "127.0.0.1:8080");
        assert_eq!(parse_bind_address("0.0.0.0").unwrap(), "0.0.0.0:3040");
        assert_eq!(parse_bind_address("0.0.0.0:9000").unwrap(), "0.0.0.0:9000");
        assert!(parse_bind_address("localhost:http").is_err());
    }
}
