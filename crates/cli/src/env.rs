//! Recognized environment variables (§6).
//!
//! All product-specific variables use the `VGDB_` prefix. The two
//! Kubernetes-provided variables (`KUBERNETES_SERVICE_HOST`,
//! `KUBERNETES_TOKEN`) and the two endpoint overrides (`PUBLIC_IP`,
//! `POD_IP`) are not product-specific and are read as-is.

use std::env;

/// Resolved node identity and transport settings pulled from the
/// environment, with CLI flags given precedence where both exist.
#[derive(Debug, Clone, Default)]
pub struct EnvSettings {
    pub role: Option<String>,
    pub http_port: Option<u16>,
    pub ws_port: Option<u16>,
    pub dns: Option<String>,
    pub service: Option<String>,
    pub namespace: Option<String>,
    pub kubernetes_service_host: Option<String>,
    pub kubernetes_token: Option<String>,
    pub models_path: Option<String>,
    pub public_ip: Option<String>,
    pub pod_ip: Option<String>,
}

impl EnvSettings {
    pub fn from_env() -> Self {
        Self {
            role: env::var("VGDB_ROLE").ok(),
            http_port: env::var("VGDB_HTTP_PORT").ok().and_then(|v| v.parse().ok()),
            ws_port: env::var("VGDB_WS_PORT").ok().and_then(|v| v.parse().ok()),
            dns: env::var("VGDB_DNS").ok(),
            service: env::var("VGDB_SERVICE").ok(),
            namespace: env::var("VGDB_NAMESPACE").ok(),
            kubernetes_service_host: env::var("KUBERNETES_SERVICE_HOST").ok(),
            kubernetes_token: env::var("KUBERNETES_TOKEN").ok(),
            models_path: env::var("VGDB_MODELS_PATH").ok(),
            public_ip: env::var("PUBLIC_IP").ok(),
            pod_ip: env::var("POD_IP").ok(),
        }
    }

    /// The advertised endpoint's host override, preferring an explicit
    /// public IP over a pod-internal one (§6 "endpoint override for the
    /// discovery advertisement").
    pub fn advertised_host(&self) -> Option<&str> {
        self.public_ip.as_deref().or(self.pod_ip.as_deref())
    }

    /// Peer-discovery addresses in order of precedence: explicit
    /// `--seeds`, then DNS, then Kubernetes Endpoints, then none (storage-
    /// based discovery via `_cluster/config.json` still applies
    /// regardless — see [`vgdb_consensus::discovery`]).
    pub fn resolve_seeds(&self, flag_seeds: &[String]) -> Vec<String> {
        if !flag_seeds.is_empty() {
            return flag_seeds.to_vec();
        }
        if let Some(dns) = &self.dns {
            return vec![dns.clone()];
        }
        if let (Some(service), Some(namespace)) = (&self.service, &self.namespace) {
            return vec![format!("{service}.{namespace}.svc.cluster.local")];
        }
        if let Some(host) = &self.kubernetes_service_host {
            return vec![host.clone()];
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advertised_host_prefers_public_ip_over_pod_ip() {
        let env = EnvSettings { public_ip: Some("1.2.3.4".into()), pod_ip: Some("10.0.0.1".into()), ..Default::default() };
        assert_eq!(env.advertised_host(), Some("1.2.3.4"));
    }

    #[test]
    fn advertised_host_falls_back_to_pod_ip() {
        let env = EnvSettings { pod_ip: Some("10.0.0.1".into()), ..Default::default() };
        assert_eq!(env.advertised_host(), Some("10.0.0.1"));
    }

    #[test]
    fn resolve_seeds_prefers_explicit_flag() {
        let env = EnvSettings { dns: Some("seed.internal".into()), ..Default::default() };
        assert_eq!(env.resolve_seeds(&["a:8080".to_string()]), vec!["a:8080".to_string()]);
    }

    #[test]
    fn resolve_seeds_falls_back_to_dns_then_k8s_service() {
        let env = EnvSettings { dns: Some("seed.internal".into()), ..Default::default() };
        assert_eq!(env.resolve_seeds(&[]), vec!["seed.internal".to_string()]);

        let env = EnvSettings { service: Some("vgdb".into()), namespace: Some("prod".into()), ..Default::default() };
        assert_eq!(env.resolve_seeds(&[]), vec!["vgdb.prod.svc.cluster.local".to_string()]);
    }
}
