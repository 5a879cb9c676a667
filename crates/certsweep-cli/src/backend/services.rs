//! Service enumeration through the Kubernetes API

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use tracing::debug;

use certsweep_core::backend::ServiceLister;
use certsweep_core::{Error as ScanError, Result as ScanResult, ServiceRef};

/// Port reported for services that declare none.
const NO_PORT: &str = "0";

/// Lists services with a kube client built per context from one kubeconfig.
pub struct KubeServiceLister {
    kubeconfig: Kubeconfig,
}

impl KubeServiceLister {
    pub fn new(kubeconfig: Kubeconfig) -> Self {
        Self { kubeconfig }
    }

    async fn client_for(&self, context: &str) -> ScanResult<Client> {
        let options = KubeConfigOptions {
            context: Some(context.to_string()),
            ..Default::default()
        };
        let config = Config::from_custom_kubeconfig(self.kubeconfig.clone(), &options)
            .await
            .map_err(|e| ScanError::service_list(context, e.to_string()))?;
        Client::try_from(config).map_err(|e| ScanError::service_list(context, e.to_string()))
    }
}

#[async_trait]
impl ServiceLister for KubeServiceLister {
    async fn list_services(&self, context: &str, namespace: &str) -> ScanResult<Vec<ServiceRef>> {
        let client = self.client_for(context).await?;
        let api: Api<Service> = Api::namespaced(client, namespace);

        let services = api
            .list(&ListParams::default())
            .await
            .map_err(|e| ScanError::service_list(context, e.to_string()))?;

        debug!(
            context = %context,
            namespace = %namespace,
            count = services.items.len(),
            "Listed services"
        );
        Ok(services.items.iter().filter_map(service_ref).collect())
    }
}

/// Name and first declared port of a service.
fn service_ref(service: &Service) -> Option<ServiceRef> {
    let name = service.metadata.name.clone()?;
    let port = service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .and_then(|ports| ports.first())
        .map(|p| p.port.to_string())
        .unwrap_or_else(|| NO_PORT.to_string());
    Some(ServiceRef::new(name, port))
}
