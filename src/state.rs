use std::sync::Arc;

use crate::{
    config::AppConfig, db::OrmConn, gateway::NowPaymentsClient, middleware::auth::TokenKeys,
    webhook::IpnVerifier,
};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub tokens: TokenKeys,
    pub gateway: NowPaymentsClient,
    pub ipn: IpnVerifier,
}

impl AppState {
    /// Wires every collaborator from one configuration snapshot.
    pub fn new(orm: OrmConn, config: AppConfig) -> anyhow::Result<Self> {
        let tokens = TokenKeys::new(&config.jwt);
        let gateway = NowPaymentsClient::new(&config.gateway)?;
        let ipn = IpnVerifier::new(&config.gateway.ipn_secret)?;
        Ok(Self {
            orm,
            config: Arc::new(config),
            tokens,
            gateway,
            ipn,
        })
    }
}
