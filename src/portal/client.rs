use crate::error::PortalError;
use crate::model::Granularity;
use crate::portal::contracts::{extract_contracts, ContractMap};
use crate::portal::export::{meter_uuid_from_analysis, AnalysisInitRequest, ExportRequest, ExportWindow};
use reqwest::{Client as HttpClient, RequestBuilder};
use std::fmt;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

mod endpoint {
    pub const START: &str = "/start";
    pub const LOGIN: &str = "/loginProcess";
    pub const HOME: &str = "/home";
    pub const CONTRACT: &str = "/dataContextUpdate";
    pub const METER: &str = "/consumptionDetails";
    pub const ANALYSIS_INIT: &str = "/analysis/initData";
    pub const CSV_REQUEST: &str = "/analysis/csvRequest";
    pub const CSV_DOWNLOAD: &str = "/analysis/csvDownload";
    pub const LOGOUT: &str = "/logout";
}

/// Progress of a portal session. Stages only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Unauthenticated,
    Opened,
    Authenticated,
    ContractSelected,
    MeterSelected,
    ExportReady,
    LoggedOut,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stage::Unauthenticated => write!(f, "unauthenticated"),
            Stage::Opened => write!(f, "opened"),
            Stage::Authenticated => write!(f, "authenticated"),
            Stage::ContractSelected => write!(f, "contract-selected"),
            Stage::MeterSelected => write!(f, "meter-selected"),
            Stage::ExportReady => write!(f, "export-ready"),
            Stage::LoggedOut => write!(f, "logged-out"),
        }
    }
}

/// One authenticated conversation with the customer portal.
///
/// Cookies carry the portal's notion of the logged-in user and the selected
/// contract and meter, so every call goes through the same cookie-keeping
/// HTTP client. Calls made out of order are rejected before any request.
pub struct Session {
    http_client: HttpClient,
    base_url: String,
    stage: Stage,
    meter_uuid: Option<String>,
}

impl Session {
    pub fn new(base_url: &str) -> Result<Self, PortalError> {
        let http_client = HttpClient::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            stage: Stage::Unauthenticated,
            meter_uuid: None,
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Loads the landing page so the portal issues a session cookie.
    pub async fn open(&mut self) -> Result<(), PortalError> {
        self.expect_stage("open", &[Stage::Unauthenticated])?;
        self.send(self.get(endpoint::START), endpoint::START).await?;
        self.stage = Stage::Opened;
        Ok(())
    }

    /// Submits the login form.
    ///
    /// The portal answers rejected credentials with an ordinary page, so a
    /// wrong password only shows up later as missing contracts or meter data.
    pub async fn authenticate(&mut self, user: &str, password: &str) -> Result<(), PortalError> {
        self.expect_stage("authenticate", &[Stage::Opened])?;
        let request = self.post(endpoint::LOGIN).form(&[
            ("login", user),
            ("password", password),
            ("oneTimePassword", ""),
        ]);
        self.send(request, endpoint::LOGIN).await?;
        self.stage = Stage::Authenticated;
        tracing::info!("Logged in to portal as {}", user);
        Ok(())
    }

    /// Finds the selection token of `target_label`.
    ///
    /// The home page only lists contracts other than the active one, so after
    /// the first listing the first contract is selected to make the portal
    /// reveal the rest. Returns `Ok(None)` for accounts without a contract
    /// menu, which need no selection at all.
    pub async fn discover_contracts(
        &mut self,
        target_label: &str,
    ) -> Result<Option<String>, PortalError> {
        self.expect_stage("discover_contracts", &[Stage::Authenticated])?;

        let home = self.send(self.get(endpoint::HOME), endpoint::HOME).await?;
        let contracts = extract_contracts(&home, ContractMap::new())?;
        let Some((_, pivot_token)) = contracts.first() else {
            tracing::info!("No contract menu found, assuming a single-contract account");
            return Ok(None);
        };

        let pivot = self.select_contract_request(pivot_token);
        let page = self.send(pivot, endpoint::CONTRACT).await?;
        let contracts = extract_contracts(&page, contracts)?;
        tracing::debug!(
            "Portal offers {} contracts: {:?}",
            contracts.len(),
            contracts.labels()
        );

        match contracts.get(target_label) {
            Some(token) => Ok(Some(token.to_string())),
            None => Err(PortalError::ContractNotFound {
                label: target_label.to_string(),
                available: contracts.labels(),
            }),
        }
    }

    pub async fn select_contract(&mut self, token: &str) -> Result<(), PortalError> {
        self.expect_stage("select_contract", &[Stage::Authenticated])?;
        self.send(self.select_contract_request(token), endpoint::CONTRACT)
            .await?;
        self.stage = Stage::ContractSelected;
        Ok(())
    }

    /// Selects the metering point by its human-readable code.
    pub async fn select_meter(&mut self, metering_code: &str) -> Result<(), PortalError> {
        self.expect_stage(
            "select_meter",
            &[Stage::Authenticated, Stage::ContractSelected],
        )?;
        let request = self
            .get(endpoint::METER)
            .query(&[("meteringCode", metering_code)]);
        self.send(request, endpoint::METER).await?;
        self.stage = Stage::MeterSelected;
        tracing::info!("Selected metering point {}", metering_code);
        Ok(())
    }

    /// Initialises the analysis view and records the selected meter's UUID.
    pub async fn request_export_metadata(&mut self) -> Result<String, PortalError> {
        self.expect_stage("request_export_metadata", &[Stage::MeterSelected])?;
        let request = self
            .post(endpoint::ANALYSIS_INIT)
            .json(&AnalysisInitRequest::default());
        let body = self.send(request, endpoint::ANALYSIS_INIT).await?;

        let meter_uuid = meter_uuid_from_analysis(&body)?;
        tracing::debug!("Meter UUID is {}", meter_uuid);
        self.meter_uuid = Some(meter_uuid.clone());
        self.stage = Stage::ExportReady;
        Ok(meter_uuid)
    }

    /// Asks the portal to prepare a CSV export. The answer carries no data.
    pub async fn request_export(
        &mut self,
        granularity: Granularity,
        window: &ExportWindow,
    ) -> Result<(), PortalError> {
        self.expect_stage("request_export", &[Stage::ExportReady])?;
        let meter_uuid = self
            .meter_uuid
            .as_deref()
            .ok_or_else(|| PortalError::out_of_order("request_export", self.stage))?;
        let body = ExportRequest::new(meter_uuid, granularity, window);

        let request = self.post(endpoint::CSV_REQUEST).json(&body);
        self.send(request, endpoint::CSV_REQUEST).await?;
        tracing::info!(
            "Requested {} export from {} to {}",
            granularity,
            window.begin,
            window.end
        );
        Ok(())
    }

    /// Downloads the export prepared by the last [`Session::request_export`].
    pub async fn download_export(&mut self) -> Result<String, PortalError> {
        self.expect_stage("download_export", &[Stage::ExportReady])?;
        self.send(self.get(endpoint::CSV_DOWNLOAD), endpoint::CSV_DOWNLOAD)
            .await
    }

    /// Logs out. The session counts as closed even if the request fails.
    pub async fn close(&mut self) -> Result<(), PortalError> {
        if self.stage == Stage::LoggedOut {
            return Ok(());
        }
        self.stage = Stage::LoggedOut;
        self.meter_uuid = None;
        self.send(self.get(endpoint::LOGOUT), endpoint::LOGOUT).await?;
        tracing::info!("Logged out of portal");
        Ok(())
    }

    fn expect_stage(&self, operation: &'static str, allowed: &[Stage]) -> Result<(), PortalError> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(PortalError::out_of_order(operation, self.stage))
        }
    }

    fn select_contract_request(&self, token: &str) -> RequestBuilder {
        self.get(endpoint::CONTRACT).query(&[("key", token)])
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http_client.get(format!("{}{}", self.base_url, path))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http_client.post(format!("{}{}", self.base_url, path))
    }

    async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<String, PortalError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PortalError::server_error(status, endpoint));
        }
        Ok(response.text().await?)
    }
}
