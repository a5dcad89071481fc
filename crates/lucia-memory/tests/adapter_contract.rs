use lucia_memory::MemoryAdapter;

#[tokio::test]
async fn passes_the_adapter_suite() {
    let adapter = MemoryAdapter::new();
    lucia_adapter_test::test_adapter(&adapter).await;
}
