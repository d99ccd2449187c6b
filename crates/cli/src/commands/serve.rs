//! `citeweave serve`: Start the HTTP API server.

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let workspace = super::open_workspace(&config).await?;

    println!("Citeweave Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Origin:    {}", config.gateway.allowed_origin);
    println!("   State:     {}", config.state_path().display());

    citeweave_gateway::start(&config, workspace).await?;

    Ok(())
}
