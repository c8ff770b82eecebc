pub async fn root() -> &'static str {
    "CardCatch backend is live!"
}

pub async fn healthz() -> &'static str {
    "ok"
}
