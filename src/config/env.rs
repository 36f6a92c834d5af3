use super::ConfigError;
use log::{ error, info, warn };
use std::collections::HashMap;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const SUPABASE_URL: &str = "SUPABASE_URL";
pub const SUPABASE_KEY: &str = "SUPABASE_KEY";
pub const NODE_ENV: &str = "NODE_ENV";

const REQUIRED: [&str; 3] = [OPENAI_API_KEY, SUPABASE_URL, SUPABASE_KEY];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvContext {
    /// The API server; reads the plain variable names.
    Server,
    /// A front-end process; reads the client-exposed (`VITE_`) names.
    Client,
}

impl EnvContext {
    fn variable_for(&self, name: &str) -> String {
        match self {
            EnvContext::Server => name.to_string(),
            EnvContext::Client if name == NODE_ENV => "MODE".to_string(),
            EnvContext::Client => format!("VITE_{}", name),
        }
    }
}

/// Snapshot of the variables this service cares about.
#[derive(Debug, Clone)]
pub struct Environment {
    context: EnvContext,
    values: HashMap<String, String>,
}

impl Environment {
    pub fn capture(context: EnvContext) -> Self {
        Self::from_lookup(context, |name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(context: EnvContext, lookup: F) -> Self where F: Fn(&str) -> Option<String> {
        let mut values = HashMap::new();
        for name in REQUIRED.iter().chain(std::iter::once(&NODE_ENV)) {
            let variable = context.variable_for(name);
            if let Some(value) = lookup(&variable).filter(|v| !v.is_empty()) {
                values.insert(name.to_string(), value);
            }
        }
        Self { context, values }
    }

    /// Value of a logical variable in the active context, or `""` when unset.
    pub fn get(&self, name: &str) -> String {
        self.values.get(name).cloned().unwrap_or_default()
    }

    pub fn missing(&self) -> Vec<String> {
        REQUIRED.iter()
            .filter(|name| !self.values.contains_key(**name))
            .map(|name| self.context.variable_for(name))
            .collect()
    }

    /// Fails on missing variables in the server context; only warns in the client context.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing = self.missing();
        if missing.is_empty() {
            return Ok(());
        }
        match self.context {
            EnvContext::Server => Err(ConfigError::MissingVars(missing)),
            EnvContext::Client => {
                warn!("Missing required environment variables: {}", missing.join(", "));
                Ok(())
            }
        }
    }

    pub fn log_status(&self) {
        let label = match self.context {
            EnvContext::Server => "Server",
            EnvContext::Client => "Client",
        };
        info!("Environment: {}", label);
        let has_key = !self.get(OPENAI_API_KEY).is_empty();
        info!("OpenAI Key available: {}", has_key);
        if !has_key {
            error!("MISSING OPENAI API KEY - Chat will not work");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| vars.iter().find(|(k, _)| *k == name).map(|(_, v)| v.to_string())
    }

    #[test]
    fn absent_values_default_to_empty() {
        let env = Environment::from_lookup(EnvContext::Server, |_| None);
        assert_eq!(env.get(OPENAI_API_KEY), "");
        assert_eq!(env.get(NODE_ENV), "");
    }

    #[test]
    fn client_context_reads_exposed_names() {
        let env = Environment::from_lookup(
            EnvContext::Client,
            lookup_from(&[("OPENAI_API_KEY", "server-only"), ("VITE_OPENAI_API_KEY", "client"), ("MODE", "development")])
        );
        assert_eq!(env.get(OPENAI_API_KEY), "client");
        assert_eq!(env.get(NODE_ENV), "development");
    }

    #[test]
    fn server_validation_fails_loudly() {
        let env = Environment::from_lookup(EnvContext::Server, lookup_from(&[("SUPABASE_URL", "https://x.supabase.co")]));
        match env.validate() {
            Err(ConfigError::MissingVars(vars)) => {
                assert_eq!(vars, vec!["OPENAI_API_KEY".to_string(), "SUPABASE_KEY".to_string()]);
            }
            other => panic!("expected missing vars, got {:?}", other),
        }
    }

    #[test]
    fn client_validation_only_warns() {
        let env = Environment::from_lookup(EnvContext::Client, |_| None);
        assert!(env.validate().is_ok());
        assert_eq!(env.missing().len(), 3);
        assert!(env.missing().iter().all(|v| v.starts_with("VITE_")));
    }

    #[test]
    fn empty_values_count_as_missing() {
        let env = Environment::from_lookup(
            EnvContext::Server,
            lookup_from(&[("OPENAI_API_KEY", ""), ("SUPABASE_URL", "u"), ("SUPABASE_KEY", "k")])
        );
        assert!(env.validate().is_err());
    }
}
