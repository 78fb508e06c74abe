use solo_model::{
    AffinityLabel, ENV_CONTROLLER_URL, ENV_REMOTE_FS, ENV_WORKER_LABEL, ENV_WORKER_NAME,
    ENV_WORKER_SECRET, Env,
};

use crate::worker::WorkerHandle;

/// Everything a backing runtime needs to start one worker and let it connect back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub worker: String,
    pub label: AffinityLabel,
    pub secret: String,
    pub controller_url: String,
    pub remote_fs: String,
    /// Base environment with the bootstrap variables layered on top.
    pub env: Env,
}

impl LaunchRequest {
    pub fn for_worker(worker: &WorkerHandle, controller_url: &str, base: &Env) -> Self {
        let mut req = Self {
            worker: worker.name().to_string(),
            label: worker.label().clone(),
            secret: worker.secret().to_string(),
            controller_url: controller_url.trim_end_matches('/').to_string(),
            remote_fs: worker.remote_fs().to_string(),
            env: Env::new(),
        };
        req.env = base.merged(&req.bootstrap_env());
        req
    }

    /// Substitute `{controller}`, `{worker}`, `{label}`, `{secret}` and `{remote_fs}`.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{controller}", &self.controller_url)
            .replace("{worker}", &self.worker)
            .replace("{label}", self.label.as_str())
            .replace("{secret}", &self.secret)
            .replace("{remote_fs}", &self.remote_fs)
    }

    /// Variables the bootstrap command reads to reach the controller.
    pub fn bootstrap_env(&self) -> Env {
        let mut env = Env::new();
        env.push(ENV_CONTROLLER_URL, &self.controller_url);
        env.push(ENV_WORKER_NAME, &self.worker);
        env.push(ENV_WORKER_LABEL, self.label.as_str());
        env.push(ENV_WORKER_SECRET, &self.secret);
        env.push(ENV_REMOTE_FS, &self.remote_fs);
        env
    }

    /// Launcher-level `extra` variables, rendered and layered on top of `env`.
    pub fn rendered_env(&self, extra: &Env) -> Env {
        let extra: Env = extra
            .iter()
            .map(|kv| (kv.key().to_string(), self.render(kv.value())))
            .collect();
        self.env.merged(&extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solo_model::QueueItemId;

    fn request() -> LaunchRequest {
        let worker = WorkerHandle::new(
            "docker_ab12-1",
            AffinityLabel::parse("docker_ab12").unwrap(),
            QueueItemId(4),
            "/home/solo",
        );
        let mut base = Env::new();
        base.push("HTTP_PROXY", "http://proxy:3128");
        base.push(ENV_WORKER_NAME, "overridden");
        LaunchRequest::for_worker(&worker, "http://ci.local:8080/", &base)
    }

    #[test]
    fn render_substitutes_placeholders() {
        let req = request();
        assert_eq!(
            req.render("curl {controller}/agent.jar && run {worker} {label} {remote_fs}"),
            "curl http://ci.local:8080/agent.jar && run docker_ab12-1 docker_ab12 /home/solo"
        );
        assert_eq!(req.render("{secret}"), req.secret);
    }

    #[test]
    fn bootstrap_env_overrides_base() {
        let req = request();
        assert_eq!(req.env.get("HTTP_PROXY"), Some("http://proxy:3128"));
        assert_eq!(req.env.get(ENV_WORKER_NAME), Some("docker_ab12-1"));
        assert_eq!(req.env.get(ENV_CONTROLLER_URL), Some("http://ci.local:8080"));
    }

    #[test]
    fn rendered_env_layers_templates_on_top() {
        let req = request();
        let mut extra = Env::new();
        extra.push("AGENT_NAME", "{worker}");
        let env = req.rendered_env(&extra);
        assert_eq!(env.get("AGENT_NAME"), Some("docker_ab12-1"));
        assert_eq!(env.get("HTTP_PROXY"), Some("http://proxy:3128"));
    }
}
