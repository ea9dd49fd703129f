use anyhow::{anyhow, Result};
use async_trait::async_trait;
use console::style;
use rocket::{
    get, http::ContentType, response::content::RawHtml, routes, Build, Config, Rocket, Shutdown,
    State,
};
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Mutex, PoisonError};

use super::{ConsentWidget, WidgetOptions, WidgetOutcome};
use crate::backend::ClientToken;
use crate::script::Script;

const LISTEN_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));
const LAUNCHER_PATH: &str = "/xs2a-app-launcher.js";

/// Hosts the XS2A consent widget on a local page and opens it in the user's browser.
pub struct BrowserWidget {
    port: u16,
    open_browser: fn(&str) -> io::Result<()>,
}

impl BrowserWidget {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            open_browser: open_in_browser,
        }
    }

    async fn serve(&self, state: ServerState) -> Result<Option<WidgetOutcome>> {
        let server = consent_server(
            Config {
                log_level: rocket::config::LogLevel::Critical,
                address: LISTEN_ADDR,
                port: self.port,
                ..Default::default()
            },
            state,
        )
        .ignite()
        .await?;

        let url = format!("http://{LISTEN_ADDR}:{}", self.port);

        println!("Redirecting to your bank.");
        println!("If it doesn't open automatically, please open the following URL in your browser:");
        println!("{}", style(&url).cyan().italic());
        // the user can still open the page by hand
        if let Err(err) = (self.open_browser)(&url) {
            log::warn!("Failed to open {url} in the browser: {err}");
        }

        // runs until the page reports back or the user stops us
        let server = server.launch().await?;
        let outcome = server
            .state::<ServerState>()
            .ok_or_else(|| anyhow!("Consent page lost its state"))?
            .take_outcome();
        Ok(outcome)
    }
}

fn open_in_browser(url: &str) -> io::Result<()> {
    open::that(url)
}

#[async_trait]
impl ConsentWidget for BrowserWidget {
    async fn run(
        &self,
        launcher: &Script,
        token: &ClientToken,
        options: WidgetOptions,
    ) -> WidgetOutcome {
        match self
            .serve(ServerState::new(launcher.clone(), token.clone(), options))
            .await
        {
            Ok(Some(outcome)) => outcome,
            Ok(None) => {
                log::info!("Consent page stopped before the bank flow ended");
                WidgetOutcome::Aborted
            }
            Err(err) => {
                log::error!("Failed to run consent page: {err:#}");
                WidgetOutcome::Error(format!("{err:#}"))
            }
        }
    }
}

struct ServerState {
    launcher: Script,
    token: ClientToken,
    options: WidgetOptions,
    outcome: Mutex<Option<WidgetOutcome>>,
}

impl ServerState {
    fn new(launcher: Script, token: ClientToken, options: WidgetOptions) -> Self {
        Self {
            launcher,
            token,
            options,
            outcome: Mutex::new(None),
        }
    }

    /// Returns false if an outcome was already recorded. Only the first one counts.
    fn record(&self, outcome: WidgetOutcome) -> bool {
        let mut recorded = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        if recorded.is_some() {
            log::warn!("Ignoring {outcome:?}, the consent flow already ended");
            return false;
        }
        *recorded = Some(outcome);
        true
    }

    fn take_outcome(&self) -> Option<WidgetOutcome> {
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

fn consent_server(config: Config, state: ServerState) -> Rocket<Build> {
    rocket::custom(config).manage(state).mount(
        "/",
        routes![consent_page, launcher_script, on_finished, on_error, on_abort],
    )
}

/// Make a string safe to embed as a literal inside a <script> block
fn js_string(value: &str) -> String {
    serde_json::Value::from(value)
        .to_string()
        .replace("</", "<\\/")
}

#[get("/")]
fn consent_page(state: &State<ServerState>) -> RawHtml<String> {
    let token = js_string(&state.token.0);
    let unfold_consent_details = state.options.unfold_consent_details;
    RawHtml(format!(
        r#"
        <html>
            <body>
                <script>
                    function report(path) {{
                        window.location.replace(path);
                    }}
                    function reportError(error) {{
                        report("/error?message=" + encodeURIComponent(String(error)));
                    }}
                    // The launcher calls this once it is ready
                    window.onXS2AReady = function() {{
                        try {{
                            window.XS2A.startFlow({token}, {{
                                unfoldConsentDetails: {unfold_consent_details},
                                onFinished: function() {{
                                    console.log("onFinished");
                                    report("/finished");
                                }},
                                onError: function(error) {{
                                    console.error("onError", error);
                                    reportError(error);
                                }},
                                onAbort: function() {{
                                    console.log("onAbort");
                                    report("/abort");
                                }}
                            }});
                        }} catch (e) {{
                            console.error(e);
                            reportError(e);
                        }}
                    }};
                </script>
                <script src="{LAUNCHER_PATH}"></script>
            </body>
        </html>
    "#
    ))
}

#[get("/xs2a-app-launcher.js")]
fn launcher_script(state: &State<ServerState>) -> (ContentType, String) {
    (ContentType::JavaScript, state.launcher.body().to_string())
}

#[get("/finished")]
fn on_finished(state: &State<ServerState>, shutdown: Shutdown) -> RawHtml<&'static str> {
    end_flow(state, shutdown, WidgetOutcome::Finished)
}

#[get("/error?<message>")]
fn on_error(
    message: Option<String>,
    state: &State<ServerState>,
    shutdown: Shutdown,
) -> RawHtml<&'static str> {
    let message = message.unwrap_or_else(|| "Unknown error".to_string());
    end_flow(state, shutdown, WidgetOutcome::Error(message))
}

#[get("/abort")]
fn on_abort(state: &State<ServerState>, shutdown: Shutdown) -> RawHtml<&'static str> {
    end_flow(state, shutdown, WidgetOutcome::Aborted)
}

fn end_flow(state: &ServerState, shutdown: Shutdown, outcome: WidgetOutcome) -> RawHtml<&'static str> {
    if !state.record(outcome) {
        return RawHtml(ALREADY_ENDED_PAGE);
    }
    shutdown.notify();
    RawHtml(DONE_PAGE)
}

const DONE_PAGE: &str = r#"
        <html>
            <body>
                <h1>Done</h1>
                <p>You can close this page now</p>
            </body>
        </html>
    "#;

const ALREADY_ENDED_PAGE: &str = r#"
        <html>
            <body>
                <h1>Already done</h1>
                <p>This bank flow has already ended. You can close this page now</p>
            </body>
        </html>
    "#;

#[cfg(test)]
mod tests {
    use rocket::http::Status;
    use rocket::local::asynchronous::Client;

    use super::*;

    fn state(token: &str) -> ServerState {
        ServerState::new(
            Script::new("https://cdn.example.com/launcher.js", "window.XS2A = {};"),
            ClientToken(token.to_string()),
            WidgetOptions {
                unfold_consent_details: true,
            },
        )
    }

    async fn client(token: &str) -> Client {
        Client::tracked(consent_server(Config::debug_default(), state(token)))
            .await
            .unwrap()
    }

    fn recorded(client: &Client) -> Option<WidgetOutcome> {
        client.rocket().state::<ServerState>().unwrap().take_outcome()
    }

    #[rocket::async_test]
    async fn page_starts_flow_with_token() {
        let client = client("T").await;
        let response = client.get("/").dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let body = response.into_string().await.unwrap();
        assert!(body.contains(r#"window.XS2A.startFlow("T", {"#));
        assert!(body.contains("unfoldConsentDetails: true"));
        assert!(body.contains(r#"<script src="/xs2a-app-launcher.js"></script>"#));
    }

    #[rocket::async_test]
    async fn page_escapes_token() {
        let client = client("</script><script>alert(1)").await;
        let body = client.get("/").dispatch().await.into_string().await.unwrap();
        assert!(!body.contains("</script><script>alert(1)"));
        assert!(body.contains(r#""<\/script><script>alert(1)""#));
    }

    #[rocket::async_test]
    async fn serves_loaded_launcher() {
        let client = client("T").await;
        let response = client.get(LAUNCHER_PATH).dispatch().await;
        assert_eq!(Some(ContentType::JavaScript), response.content_type());
        assert_eq!("window.XS2A = {};", response.into_string().await.unwrap());
    }

    #[rocket::async_test]
    async fn records_finished() {
        let client = client("T").await;
        client.get("/finished").dispatch().await;
        assert_eq!(Some(WidgetOutcome::Finished), recorded(&client));
    }

    #[rocket::async_test]
    async fn records_error_message() {
        let client = client("T").await;
        client.get("/error?message=bank%20down").dispatch().await;
        assert_eq!(
            Some(WidgetOutcome::Error("bank down".to_string())),
            recorded(&client)
        );
    }

    #[rocket::async_test]
    async fn first_callback_wins() {
        let client = client("T").await;
        let first = client.get("/abort").dispatch().await;
        assert_eq!(DONE_PAGE, first.into_string().await.unwrap());
        let second = client.get("/finished").dispatch().await;
        assert_eq!(ALREADY_ENDED_PAGE, second.into_string().await.unwrap());
        assert_eq!(Some(WidgetOutcome::Aborted), recorded(&client));
    }

    fn free_port() -> u16 {
        std::net::TcpListener::bind((LISTEN_ADDR, 0))
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn keeps_serving_when_browser_fails_to_open() {
        let port = free_port();
        let widget = BrowserWidget {
            port,
            open_browser: |_| Err(io::Error::new(io::ErrorKind::NotFound, "no browser")),
        };
        let launcher = Script::new("https://cdn.example.com/launcher.js", "window.XS2A = {};");
        let token = ClientToken("T".to_string());
        let run = tokio::spawn(async move {
            widget
                .run(
                    &launcher,
                    &token,
                    WidgetOptions {
                        unfold_consent_details: false,
                    },
                )
                .await
        });

        // the page reports back as soon as the server is up
        let http = reqwest::Client::new();
        let url = format!("http://{LISTEN_ADDR}:{port}/abort");
        let mut attempts = 0;
        while http.get(&url).send().await.is_err() {
            attempts += 1;
            assert!(attempts < 100, "consent page never came up");
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }

        assert_eq!(WidgetOutcome::Aborted, run.await.unwrap());
    }

    #[rocket::async_test]
    async fn nothing_recorded_without_callback() {
        let client = client("T").await;
        client.get("/").dispatch().await;
        assert_eq!(None, recorded(&client));
    }
}
