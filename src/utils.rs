use once_cell::sync::Lazy;

const SNIPPET_CHARS: usize = 200;

pub static RUNTIME: Lazy<Option<tokio::runtime::Runtime>> = Lazy::new(|| {
    match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
    {
        Ok(rt) => Some(rt),
        Err(err) => {
            log::error!("event=runtime_init module=utils status=error error={err}");
            None
        }
    }
});

/// Drives `fut` to completion on the shared runtime. `None` if the runtime
/// could not be built.
pub fn block_on<F: std::future::Future>(fut: F) -> Option<F::Output> {
    RUNTIME.as_ref().map(|rt| rt.block_on(fut))
}

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// `https://host` and `https://host/jsonrpc` both resolve to the JSON-RPC endpoint.
pub fn jsonrpc_endpoint(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/jsonrpc") { trimmed.to_string() } else { format!("{}/jsonrpc", trimmed) }
}

/// Single-line prefix of a response body, for error messages.
pub fn snippet(body: &str) -> String {
    let flat = body.replace(['\n', '\r'], " ");
    let mut out: String = flat.chars().take(SNIPPET_CHARS).collect();
    if flat.chars().count() > SNIPPET_CHARS {
        out.push_str("...");
    }
    out
}
