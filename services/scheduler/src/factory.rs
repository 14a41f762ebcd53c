//! Builds worker task descriptors from the configured template.

use std::collections::BTreeMap;

use fleet_events::{resource_names, Offer, Resource, ValueRange};
use fleet_id::{GroupKey, TaskId};
use fleet_reconcile::task::{CommandSpec, ContainerSpec, NetworkMode, PortMapping};
use fleet_reconcile::{TaskDescriptor, TaskDescriptorFactory};

use crate::config::TaskConfig;

/// Environment variable carrying the upstream endpoint into the worker.
pub const UPSTREAM_ENV: &str = "UPSTREAM_URL";

/// Worker template: one container per task, bridged, publishing a single
/// host port taken from the offer.
#[derive(Debug, Clone)]
pub struct TaskTemplate {
    framework_name: String,
    task: TaskConfig,
}

impl TaskTemplate {
    pub fn new(framework_name: impl Into<String>, task: TaskConfig) -> Self {
        Self {
            framework_name: framework_name.into(),
            task,
        }
    }
}

impl TaskDescriptorFactory for TaskTemplate {
    fn build(&self, group: &GroupKey, offer: &Offer) -> TaskDescriptor {
        let task_id = TaskId::new();

        let mut resources = vec![
            Resource::scalar(resource_names::CPUS, self.task.cpus),
            Resource::scalar(resource_names::MEM, self.task.mem),
        ];

        // Offers are accepted on presence alone, so an offer may have no
        // usable port; the launch then carries no port mapping.
        let host_port = offer.first_port();
        let port_mappings = match host_port {
            Some(port) => {
                resources.push(Resource::ranges(
                    resource_names::PORTS,
                    vec![ValueRange::new(port, port)],
                ));
                vec![PortMapping {
                    host_port: port,
                    container_port: self.task.container_port,
                }]
            }
            None => Vec::new(),
        };

        let mut environment = BTreeMap::new();
        environment.insert(UPSTREAM_ENV.to_string(), group.to_string());

        TaskDescriptor {
            task_id,
            name: format!("{}-{}", self.framework_name, task_id.short()),
            group: group.clone(),
            agent_id: offer.agent_id.clone(),
            resources,
            container: ContainerSpec {
                image: self.task.image.clone(),
                network: NetworkMode::Bridge,
                port_mappings,
            },
            command: CommandSpec {
                shell: false,
                value: self.task.command.clone(),
                arguments: vec![
                    format!("--elasticsearch.url={group}"),
                    format!("--server.port={}", self.task.container_port),
                ],
                environment,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_id::{AgentId, OfferId};

    fn offer(resources: Vec<Resource>) -> Offer {
        Offer {
            id: OfferId::parse("o-1").unwrap(),
            agent_id: AgentId::parse("agent-7").unwrap(),
            hostname: "node-7".to_string(),
            resources,
        }
    }

    fn template() -> TaskTemplate {
        TaskTemplate::new("fleet", TaskConfig::default())
    }

    #[test]
    fn test_build_uses_first_offered_port() {
        let group = GroupKey::parse("http://es-a:9200").unwrap();
        let offer = offer(vec![Resource::ranges(
            resource_names::PORTS,
            vec![ValueRange::new(31500, 31510), ValueRange::new(31002, 31003)],
        )]);

        let task = template().build(&group, &offer);

        assert_eq!(task.agent_id.as_str(), "agent-7");
        assert_eq!(task.group, group);
        assert_eq!(
            task.container.port_mappings,
            vec![PortMapping {
                host_port: 31002,
                container_port: 5601
            }]
        );
        assert!(task
            .resources
            .iter()
            .any(|r| r.name == resource_names::PORTS && r.range_count() == 1));
    }

    #[test]
    fn test_build_passes_upstream() {
        let group = GroupKey::parse("http://es-b:9200").unwrap();
        let task = template().build(&group, &offer(vec![]));

        assert_eq!(
            task.command.environment.get(UPSTREAM_ENV).map(String::as_str),
            Some("http://es-b:9200")
        );
        assert!(task
            .command
            .arguments
            .contains(&"--elasticsearch.url=http://es-b:9200".to_string()));
        assert!(task.container.port_mappings.is_empty());
    }

    #[test]
    fn test_build_mints_fresh_ids() {
        let group = GroupKey::parse("http://es-a:9200").unwrap();
        let offer = offer(vec![]);
        let a = template().build(&group, &offer);
        let b = template().build(&group, &offer);

        assert_ne!(a.task_id, b.task_id);
        assert!(a.name.starts_with("fleet-"));
    }

    #[test]
    fn test_build_requests_template_resources() {
        let group = GroupKey::parse("http://es-a:9200").unwrap();
        let task = TaskTemplate::new(
            "fleet",
            TaskConfig {
                cpus: 0.5,
                mem: 256.0,
                ..TaskConfig::default()
            },
        )
        .build(&group, &offer(vec![Resource::scalar(resource_names::CPUS, 8.0)]));

        let scalar = |name: &str| {
            task.resources
                .iter()
                .find(|r| r.name == name)
                .and_then(Resource::as_scalar)
        };
        assert_eq!(scalar(resource_names::CPUS), Some(0.5));
        assert_eq!(scalar(resource_names::MEM), Some(256.0));
    }
}
