use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Extra, ModelError, ServiceUrl, domain::empty_as_none};

/// Per-instance settings attached to an internal URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceInstance {
    #[serde(rename = "ListenURL", skip_serializing_if = "String::is_empty")]
    pub listen_url: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// How one service is reached: the public URL and one internal URL per backing process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    #[serde(
        rename = "ExternalURL",
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub external_url: Option<ServiceUrl>,
    #[serde(rename = "InternalURLs")]
    pub internal_urls: BTreeMap<ServiceUrl, ServiceInstance>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Service {
    /// Port of the single internal URL.
    pub fn internal_port(&self) -> Result<String, ModelError> {
        match self.internal_urls.len() {
            0 => Err(ModelError::NoInternalUrl),
            1 => self
                .internal_urls
                .keys()
                .next()
                .ok_or(ModelError::NoInternalUrl)?
                .port(),
            n => Err(ModelError::MultipleInternalUrls(n)),
        }
    }

    /// Port of the external URL.
    pub fn external_port(&self) -> Result<String, ModelError> {
        self.external_url
            .as_ref()
            .ok_or(ModelError::NoExternalUrl)?
            .port()
    }
}

/// Every service the orchestrator knows how to configure.
///
/// Sections for other services (`Workbench2`, `Composer`, ...) are carried in
/// [`Services::extra`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceKind {
    Controller,
    DispatchCloud,
    GitHttp,
    Health,
    Keepbalance,
    Keepproxy,
    Keepstore,
    RailsApi,
    WebDav,
    WebDavDownload,
    Websocket,
    Workbench1,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 12] = [
        ServiceKind::Controller,
        ServiceKind::DispatchCloud,
        ServiceKind::GitHttp,
        ServiceKind::Health,
        ServiceKind::Keepbalance,
        ServiceKind::Keepproxy,
        ServiceKind::Keepstore,
        ServiceKind::RailsApi,
        ServiceKind::WebDav,
        ServiceKind::WebDavDownload,
        ServiceKind::Websocket,
        ServiceKind::Workbench1,
    ];

    /// Name used in the config document and in health check keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Controller => "Controller",
            ServiceKind::DispatchCloud => "DispatchCloud",
            ServiceKind::GitHttp => "GitHTTP",
            ServiceKind::Health => "Health",
            ServiceKind::Keepbalance => "Keepbalance",
            ServiceKind::Keepproxy => "Keepproxy",
            ServiceKind::Keepstore => "Keepstore",
            ServiceKind::RailsApi => "RailsAPI",
            ServiceKind::WebDav => "WebDAV",
            ServiceKind::WebDavDownload => "WebDAVDownload",
            ServiceKind::Websocket => "Websocket",
            ServiceKind::Workbench1 => "Workbench1",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Services {
    #[serde(rename = "Controller")]
    pub controller: Service,
    #[serde(rename = "DispatchCloud")]
    pub dispatch_cloud: Service,
    #[serde(rename = "GitHTTP")]
    pub git_http: Service,
    #[serde(rename = "Health")]
    pub health: Service,
    #[serde(rename = "Keepbalance")]
    pub keepbalance: Service,
    #[serde(rename = "Keepproxy")]
    pub keepproxy: Service,
    #[serde(rename = "Keepstore")]
    pub keepstore: Service,
    #[serde(rename = "RailsAPI")]
    pub rails_api: Service,
    #[serde(rename = "WebDAV")]
    pub webdav: Service,
    #[serde(rename = "WebDAVDownload")]
    pub webdav_download: Service,
    #[serde(rename = "Websocket")]
    pub websocket: Service,
    #[serde(rename = "Workbench1")]
    pub workbench1: Service,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Services {
    pub fn get(&self, kind: ServiceKind) -> &Service {
        match kind {
            ServiceKind::Controller => &self.controller,
            ServiceKind::DispatchCloud => &self.dispatch_cloud,
            ServiceKind::GitHttp => &self.git_http,
            ServiceKind::Health => &self.health,
            ServiceKind::Keepbalance => &self.keepbalance,
            ServiceKind::Keepproxy => &self.keepproxy,
            ServiceKind::Keepstore => &self.keepstore,
            ServiceKind::RailsApi => &self.rails_api,
            ServiceKind::WebDav => &self.webdav,
            ServiceKind::WebDavDownload => &self.webdav_download,
            ServiceKind::Websocket => &self.websocket,
            ServiceKind::Workbench1 => &self.workbench1,
        }
    }

    pub fn get_mut(&mut self, kind: ServiceKind) -> &mut Service {
        match kind {
            ServiceKind::Controller => &mut self.controller,
            ServiceKind::DispatchCloud => &mut self.dispatch_cloud,
            ServiceKind::GitHttp => &mut self.git_http,
            ServiceKind::Health => &mut self.health,
            ServiceKind::Keepbalance => &mut self.keepbalance,
            ServiceKind::Keepproxy => &mut self.keepproxy,
            ServiceKind::Keepstore => &mut self.keepstore,
            ServiceKind::RailsApi => &mut self.rails_api,
            ServiceKind::WebDav => &mut self.webdav,
            ServiceKind::WebDavDownload => &mut self.webdav_download,
            ServiceKind::Websocket => &mut self.websocket,
            ServiceKind::Workbench1 => &mut self.workbench1,
        }
    }

    /// Services that have at least one internal URL, in [`ServiceKind::ALL`] order.
    pub fn configured(&self) -> impl Iterator<Item = (ServiceKind, &Service)> {
        ServiceKind::ALL
            .into_iter()
            .map(|kind| (kind, self.get(kind)))
            .filter(|(_, svc)| !svc.internal_urls.is_empty())
    }
}
