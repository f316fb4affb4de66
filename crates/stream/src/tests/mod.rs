mod variable_tests;
