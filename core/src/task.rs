/// Run `f` on a detached tokio task, or inline when there is no runtime on this thread.
pub fn spawn_or_run<F>(f: F)
where F: FnOnce() + Send + 'static {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move { f() });
        }
        Err(_) => f(),
    }
}
