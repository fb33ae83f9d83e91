mod test_early_candidates;
