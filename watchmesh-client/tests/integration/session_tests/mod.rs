mod test_host_transfer;
